//! KYC business logic - Identity and business document verification.
//!
//! Each account has at most one submission, upserted on `user_id`. The owner edits it while
//! it is `draft` or `rejected` and submits it for review; admins move it through review and
//! every admin decision is recorded in `kyc_logs`. Automated checks (OCR of uploaded ID
//! documents and duplicate-number detection) only raise flags for reviewers, they never
//! block a submission.

use crate::{
    core::{
        profile::non_empty,
        shipment::normalize_extension,
        status::{KycStatus, Lifecycle, Role, update_where},
    },
    entities::{KycSubmission, kyc_log, kyc_submission},
    errors::{Error, Result},
    services::{Bucket, EmailMessage, Mailer, ObjectStore, TextExtractor},
};
use regex::Regex;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // Patterns are compile-time constants
static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}\d{4}[A-Z]$").expect("valid PAN regex"));

#[allow(clippy::expect_used)]
static PAN_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[A-Z]{5}\d{4}[A-Z]").expect("valid PAN search regex"));

#[allow(clippy::expect_used)]
static AADHAAR_IN_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[\s.-]?\d{4}[\s.-]?\d{4}\b").expect("valid Aadhaar search regex")
});

/// Flag raised when the typed Aadhaar differs from the one read off the card.
pub const AADHAAR_MISMATCH: &str = "Aadhaar typed does not match image text.";
/// Flag raised when the typed PAN differs from the one read off the card.
pub const PAN_MISMATCH: &str = "PAN typed does not match image text.";
/// Flag raised when another account already uses the Aadhaar number.
pub const DUPLICATE_AADHAAR: &str = "Duplicate Aadhaar already used by another account.";
/// Flag raised when another account already uses the PAN.
pub const DUPLICATE_PAN: &str = "Duplicate PAN already used by another account.";

/// Normalises an Aadhaar number: non-digits are stripped and exactly 12 digits must remain.
#[must_use]
pub fn normalize_aadhaar(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 12).then_some(digits)
}

fn compact_upper(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Normalises a PAN: uppercase, whitespace removed, five letters, four digits, one letter.
#[must_use]
pub fn normalize_pan(raw: &str) -> Option<String> {
    let pan = compact_upper(raw);
    PAN_RE.is_match(&pan).then_some(pan)
}

/// Normalises a GSTIN: uppercase, whitespace removed, 15 alphanumerics.
#[must_use]
pub fn normalize_gstin(raw: &str) -> Option<String> {
    let gstin = compact_upper(raw);
    (gstin.len() == 15 && gstin.chars().all(|c| c.is_ascii_alphanumeric())).then_some(gstin)
}

/// Normalises an importer-exporter code: uppercase, whitespace removed, 10 alphanumerics.
#[must_use]
pub fn normalize_iec(raw: &str) -> Option<String> {
    let iec = compact_upper(raw);
    (iec.len() == 10 && iec.chars().all(|c| c.is_ascii_alphanumeric())).then_some(iec)
}

/// Collapses runs of whitespace into single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First Aadhaar-shaped number in OCR text, digits only.
///
/// Groups may be split by spaces, hyphens or dots. When no grouped number is
/// found, the whole text is tried with every non-digit stripped.
#[must_use]
pub fn find_aadhaar(text: &str) -> Option<String> {
    AADHAAR_IN_TEXT_RE
        .find_iter(text)
        .find_map(|m| normalize_aadhaar(m.as_str()))
        .or_else(|| normalize_aadhaar(text))
}

/// First PAN-shaped token in OCR text, uppercased.
#[must_use]
pub fn find_pan(text: &str) -> Option<String> {
    PAN_IN_TEXT_RE
        .find(text)
        .map(|m| m.as_str().to_uppercase())
}

/// Uploadable KYC document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Front of the Aadhaar card
    AadhaarFront,
    /// Back of the Aadhaar card
    AadhaarBack,
    /// PAN card
    Pan,
    /// Importer-exporter code certificate
    Iec,
    /// GST registration certificate
    Gst,
}

impl DocumentKind {
    /// Name used in object keys and routes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AadhaarFront => "aadhaar-front",
            Self::AadhaarBack => "aadhaar-back",
            Self::Pan => "pan",
            Self::Iec => "iec",
            Self::Gst => "gst",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aadhaar-front" => Ok(Self::AadhaarFront),
            "aadhaar-back" => Ok(Self::AadhaarBack),
            "pan" => Ok(Self::Pan),
            "iec" => Ok(Self::Iec),
            "gst" => Ok(Self::Gst),
            other => Err(Error::validation(format!("Unknown KYC document kind: {other}"))),
        }
    }
}

/// KYC form fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KycForm {
    /// Legal name
    #[serde(default)]
    pub name: String,
    /// Postal address
    pub address: Option<String>,
    /// Registered company name
    pub company_name: Option<String>,
    /// Aadhaar number
    pub aadhaar_number: Option<String>,
    /// PAN
    pub pan_number: Option<String>,
    /// Importer-exporter code
    pub iec_code: Option<String>,
    /// GSTIN
    pub gstin: Option<String>,
}

/// Values read from uploaded documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extracted {
    /// Aadhaar number found on the front or back of the card
    pub aadhaar_from_img: Option<String>,
    /// PAN found on the PAN card
    pub pan_from_img: Option<String>,
}

/// Outcome of the automated checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Values read from the documents
    pub extracted: Extracted,
    /// Issues for reviewers
    pub flags: Vec<String>,
}

/// Flags stored on a submission.
#[must_use]
pub fn flags_of(submission: &kyc_submission::Model) -> Vec<String> {
    submission
        .flags
        .get("issues")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Reviewer document requests stored on a submission.
#[must_use]
pub fn requested_docs_of(submission: &kyc_submission::Model) -> Vec<String> {
    serde_json::from_value(submission.requested_docs.clone()).unwrap_or_default()
}

fn flags_json(flags: &[String]) -> Json {
    serde_json::json!({ "issues": flags })
}

/// The user's submission, if any.
pub async fn get_submission<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<Option<kyc_submission::Model>> {
    KycSubmission::find()
        .filter(kyc_submission::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Fails with [`Error::KycRequired`] unless the user's submission is approved.
pub async fn require_approved<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<()> {
    match get_submission(db, user_id).await? {
        Some(s) if s.status == KycStatus::Approved => Ok(()),
        _ => Err(Error::KycRequired),
    }
}

/// Duplicate flags for numbers already used by another account's active submission.
pub async fn duplicate_flags<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    aadhaar: Option<&str>,
    pan: Option<&str>,
) -> Result<Vec<String>> {
    let mut flags = Vec::new();
    let checks = [
        (kyc_submission::Column::AadhaarNumber, aadhaar, DUPLICATE_AADHAAR),
        (kyc_submission::Column::PanNumber, pan, DUPLICATE_PAN),
    ];
    for (column, value, flag) in checks {
        let Some(value) = value else { continue };
        let taken = KycSubmission::find()
            .filter(column.eq(value))
            .filter(kyc_submission::Column::UserId.ne(user_id))
            .filter(kyc_submission::Column::Status.is_in(KycStatus::ACTIVE))
            .one(db)
            .await?
            .is_some();
        if taken {
            flags.push(flag.to_string());
        }
    }
    Ok(flags)
}

fn empty_submission(user_id: &str, now: chrono::DateTime<chrono::Utc>) -> kyc_submission::ActiveModel {
    kyc_submission::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        name: Set(String::new()),
        address: Set(None),
        company_name: Set(None),
        aadhaar_number: Set(None),
        pan_number: Set(None),
        iec_code: Set(None),
        gstin: Set(None),
        doc_aadhaar_front: Set(None),
        doc_aadhaar_back: Set(None),
        doc_pan: Set(None),
        doc_iec: Set(None),
        doc_gstin: Set(None),
        ai_extracted: Set(serde_json::json!({})),
        flags: Set(flags_json(&[])),
        status: Set(KycStatus::Draft),
        requested_docs: Set(serde_json::json!([])),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Normalises an optional identifier, keeping the trimmed raw value when it does not
/// validate.
fn lenient(value: Option<String>, normalize: fn(&str) -> Option<String>) -> Option<String> {
    non_empty(value).map(|raw| normalize(&raw).unwrap_or(raw))
}

fn strict(
    value: Option<String>,
    normalize: fn(&str) -> Option<String>,
    label: &str,
) -> Result<Option<String>> {
    non_empty(value)
        .map(|raw| normalize(&raw).ok_or_else(|| Error::validation(format!("Invalid {label}"))))
        .transpose()
}

/// Saves the owner's KYC form as a draft, or submits it for review.
///
/// Drafts accept partial or not-yet-valid values. Submitting requires a name and valid
/// Aadhaar and PAN numbers, validates IEC and GSTIN when given, and refreshes the duplicate
/// flags. Only `draft` and `rejected` submissions may be changed.
pub async fn save_submission(
    db: &DatabaseConnection,
    user_id: &str,
    form: KycForm,
    submit: bool,
) -> Result<kyc_submission::Model> {
    let txn = db.begin().await?;
    let existing = get_submission(&txn, user_id).await?;

    let current = existing.as_ref().map_or(KycStatus::Draft, |s| s.status);
    let target = if submit {
        KycStatus::Submitted
    } else {
        KycStatus::Draft
    };
    let next = current.transition(target, Role::Owner)?;

    let name = form.name.trim().to_string();
    let (aadhaar, pan, iec, gstin) = if submit {
        if name.is_empty() {
            return Err(Error::validation("Name is required to submit"));
        }
        let aadhaar = strict(form.aadhaar_number, normalize_aadhaar, "Aadhaar number")?
            .ok_or_else(|| Error::validation("Aadhaar number is required to submit"))?;
        let pan = strict(form.pan_number, normalize_pan, "PAN")?
            .ok_or_else(|| Error::validation("PAN is required to submit"))?;
        (
            Some(aadhaar),
            Some(pan),
            strict(form.iec_code, normalize_iec, "IEC code")?,
            strict(form.gstin, normalize_gstin, "GSTIN")?,
        )
    } else {
        (
            lenient(form.aadhaar_number, normalize_aadhaar),
            lenient(form.pan_number, normalize_pan),
            lenient(form.iec_code, normalize_iec),
            lenient(form.gstin, normalize_gstin),
        )
    };

    let now = chrono::Utc::now();
    let mut flags = existing.as_ref().map(flags_of).unwrap_or_default();
    if submit {
        flags.retain(|f| f != DUPLICATE_AADHAAR && f != DUPLICATE_PAN);
        flags.extend(duplicate_flags(&txn, user_id, aadhaar.as_deref(), pan.as_deref()).await?);
    }

    let is_new = existing.is_none();
    let mut active: kyc_submission::ActiveModel = match existing {
        Some(row) => row.into(),
        None => empty_submission(user_id, now),
    };
    active.name = Set(name);
    active.address = Set(non_empty(form.address));
    active.company_name = Set(non_empty(form.company_name));
    active.aadhaar_number = Set(aadhaar);
    active.pan_number = Set(pan);
    active.iec_code = Set(iec);
    active.gstin = Set(gstin);
    active.flags = Set(flags_json(&flags));
    active.status = Set(next);
    active.updated_at = Set(now);

    let saved = if is_new {
        active.insert(&txn).await?
    } else {
        active.update(&txn).await?
    };
    txn.commit().await?;

    tracing::info!(user_id, status = next.as_str(), "Saved KYC submission");
    Ok(saved)
}

/// Stores an uploaded KYC document and records its path on the submission, creating a
/// draft submission when the user has none.
pub async fn upload_document(
    db: &DatabaseConnection,
    store: &ObjectStore,
    user_id: &str,
    kind: DocumentKind,
    ext: &str,
    bytes: &[u8],
) -> Result<kyc_submission::Model> {
    if bytes.is_empty() {
        return Err(Error::validation("Uploaded file is empty"));
    }
    let existing = get_submission(db, user_id).await?;
    if let Some(row) = &existing
        && !row.status.is_editable()
    {
        return Err(Error::forbidden(format!(
            "KYC submission cannot be changed while {}",
            row.status.as_str()
        )));
    }

    let now = chrono::Utc::now();
    let key = format!(
        "{user_id}/kyc/{}-{}.{}",
        kind.as_str(),
        now.timestamp_millis(),
        normalize_extension(ext)?
    );
    store.put(Bucket::KycDocs, &key, bytes).await?;

    let read = existing.as_ref().map(|row| (row.id.clone(), row.updated_at));
    let mut active: kyc_submission::ActiveModel = match existing {
        Some(row) => row.into(),
        None => empty_submission(user_id, now),
    };
    let path = Set(Some(key.clone()));
    match kind {
        DocumentKind::AadhaarFront => active.doc_aadhaar_front = path,
        DocumentKind::AadhaarBack => active.doc_aadhaar_back = path,
        DocumentKind::Pan => active.doc_pan = path,
        DocumentKind::Iec => active.doc_iec = path,
        DocumentKind::Gst => active.doc_gstin = path,
    }
    active.updated_at = Set(now);

    let saved = match read {
        None => active.insert(db).await.map_err(Error::from),
        Some((kyc_id, read_at)) => save_if_unchanged(db, active, &kyc_id, read_at).await,
    };
    match saved {
        Ok(saved) => {
            tracing::info!(user_id, kind = kind.as_str(), "Stored KYC document");
            Ok(saved)
        }
        Err(e) => {
            if let Err(cleanup) = store.remove(Bucket::KycDocs, &[key]).await {
                tracing::warn!(user_id, error = %cleanup, "Failed to remove orphaned document");
            }
            Err(e)
        }
    }
}

/// Writes `active` only if the submission still carries the `updated_at` that was read.
async fn save_if_unchanged(
    db: &DatabaseConnection,
    active: kyc_submission::ActiveModel,
    kyc_id: &str,
    read_at: chrono::DateTime<chrono::Utc>,
) -> Result<kyc_submission::Model> {
    let guard = Condition::all()
        .add(kyc_submission::Column::Id.eq(kyc_id))
        .add(kyc_submission::Column::UpdatedAt.eq(read_at));
    if update_where(db, active, guard).await? == 0 {
        return Err(Error::Conflict {
            entity: "kyc submission",
            id: kyc_id.to_string(),
        });
    }
    KycSubmission::find_by_id(kyc_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("kyc submission", kyc_id))
}

async fn read_document(
    store: &ObjectStore,
    extractor: &dyn TextExtractor,
    key: Option<&str>,
) -> Result<String> {
    let Some(key) = key else {
        return Ok(String::new());
    };
    let path = store.local_path(Bucket::KycDocs, key)?;
    let text = extractor.extract(&path).await?;
    Ok(collapse_whitespace(&text))
}

async fn extract_documents(
    store: &ObjectStore,
    extractor: &dyn TextExtractor,
    submission: &kyc_submission::Model,
) -> Result<Extracted> {
    let (front, back, pan) = futures::try_join!(
        read_document(store, extractor, submission.doc_aadhaar_front.as_deref()),
        read_document(store, extractor, submission.doc_aadhaar_back.as_deref()),
        read_document(store, extractor, submission.doc_pan.as_deref()),
    )?;
    Ok(Extracted {
        aadhaar_from_img: find_aadhaar(&front).or_else(|| find_aadhaar(&back)),
        pan_from_img: find_pan(&pan).and_then(|p| normalize_pan(&p)),
    })
}

/// Compares typed identifiers with the ones read off the documents and looks for
/// other accounts using the same numbers.
async fn evaluate_submission(
    db: &DatabaseConnection,
    store: &ObjectStore,
    extractor: &dyn TextExtractor,
    submission: &kyc_submission::Model,
) -> Result<CheckReport> {
    let typed_aadhaar = submission.aadhaar_number.as_deref().and_then(normalize_aadhaar);
    let typed_pan = submission.pan_number.as_deref().and_then(normalize_pan);

    let extracted = extract_documents(store, extractor, submission).await?;
    let mut flags = Vec::new();
    if let (Some(typed), Some(read)) = (&typed_aadhaar, &extracted.aadhaar_from_img)
        && typed != read
    {
        flags.push(AADHAAR_MISMATCH.to_string());
    }
    if let (Some(typed), Some(read)) = (&typed_pan, &extracted.pan_from_img)
        && typed != read
    {
        flags.push(PAN_MISMATCH.to_string());
    }
    flags.extend(
        duplicate_flags(
            db,
            &submission.user_id,
            typed_aadhaar.as_deref(),
            typed_pan.as_deref(),
        )
        .await?,
    );
    Ok(CheckReport { extracted, flags })
}

/// Report stored when the checks could not complete.
fn failed_report(user_id: &str, error: Error) -> CheckReport {
    let message = match error {
        Error::Ocr { message } => message,
        other => other.to_string(),
    };
    tracing::warn!(user_id, error = %message, "KYC document checks failed");
    CheckReport {
        extracted: Extracted::default(),
        flags: vec![format!("OCR error: {message}")],
    }
}

/// Runs OCR over the uploaded ID documents and the duplicate check, and stores the results
/// on the submission.
///
/// Any failure while checking (reading a document or the duplicate lookup) replaces all
/// flags with a single `OCR error: ...` flag.
#[tracing::instrument(skip(db, store, extractor))]
pub async fn run_checks(
    db: &DatabaseConnection,
    store: &ObjectStore,
    extractor: &dyn TextExtractor,
    user_id: &str,
) -> Result<CheckReport> {
    let submission = get_submission(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("kyc submission", user_id))?;
    if !submission.status.is_editable() {
        return Err(Error::forbidden(format!(
            "KYC submission cannot be changed while {}",
            submission.status.as_str()
        )));
    }

    let report = evaluate_submission(db, store, extractor, &submission)
        .await
        .unwrap_or_else(|e| failed_report(user_id, e));

    let kyc_id = submission.id.clone();
    let read_at = submission.updated_at;
    let mut active: kyc_submission::ActiveModel = submission.into();
    active.ai_extracted = Set(serde_json::to_value(&report.extracted)?);
    active.flags = Set(flags_json(&report.flags));
    active.updated_at = Set(chrono::Utc::now());
    save_if_unchanged(db, active, &kyc_id, read_at).await?;

    Ok(report)
}

/// Submissions waiting for review, newest first.
pub async fn review_queue(db: &DatabaseConnection) -> Result<Vec<kyc_submission::Model>> {
    KycSubmission::find()
        .filter(kyc_submission::Column::Status.is_in(KycStatus::REVIEW_QUEUE))
        .order_by_desc(kyc_submission::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Approved submissions, most recently updated first.
pub async fn approved_submissions(db: &DatabaseConnection) -> Result<Vec<kyc_submission::Model>> {
    KycSubmission::find()
        .filter(kyc_submission::Column::Status.eq(KycStatus::Approved))
        .order_by_desc(kyc_submission::Column::UpdatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Audit trail of a submission, oldest first.
pub async fn audit_log(db: &DatabaseConnection, kyc_id: &str) -> Result<Vec<kyc_log::Model>> {
    crate::entities::KycLog::find()
        .filter(kyc_log::Column::KycId.eq(kyc_id))
        .order_by_asc(kyc_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Admin decision on a submission.
///
/// The status change and its `kyc_logs` row are committed together. The team notification
/// email is sent afterwards and a delivery failure is only logged.
#[tracing::instrument(skip(db, mailer, team))]
pub async fn set_status(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    team: &[String],
    admin_id: &str,
    kyc_id: &str,
    status: KycStatus,
) -> Result<kyc_submission::Model> {
    let txn = db.begin().await?;

    let submission = KycSubmission::find_by_id(kyc_id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("kyc submission", kyc_id))?;
    let next = submission.status.transition(status, Role::Admin)?;

    let mut active: kyc_submission::ActiveModel = submission.into();
    active.status = Set(next);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    kyc_log::ActiveModel {
        kyc_id: Set(updated.id.clone()),
        admin_id: Set(admin_id.to_string()),
        action: Set(next.as_str().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    tracing::info!(kyc_id, admin_id, status = next.as_str(), "KYC status changed");

    if !team.is_empty() {
        let label = next.as_str().to_uppercase();
        let message = EmailMessage {
            to: team.to_vec(),
            subject: format!("KYC {label} for {}", updated.name),
            html: format!(
                "<p>KYC submission for <b>{}</b> was marked <b>{label}</b>.</p>",
                escape_html(&updated.name)
            ),
        };
        if let Err(e) = mailer.send(message).await {
            tracing::warn!(kyc_id, error = %e, "Failed to send KYC notification");
        }
    }

    Ok(updated)
}

/// Appends a reviewer's request for additional documents.
pub async fn request_documents(
    db: &DatabaseConnection,
    kyc_id: &str,
    note: &str,
) -> Result<kyc_submission::Model> {
    let note = note.trim();
    if note.is_empty() {
        return Err(Error::validation("Document request cannot be empty"));
    }
    let submission = KycSubmission::find_by_id(kyc_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("kyc submission", kyc_id))?;

    let mut requested = requested_docs_of(&submission);
    requested.push(note.to_string());
    let read_at = submission.updated_at;

    let mut active: kyc_submission::ActiveModel = submission.into();
    active.requested_docs = Set(serde_json::to_value(&requested)?);
    active.updated_at = Set(chrono::Utc::now());
    save_if_unchanged(db, active, kyc_id, read_at).await
}
