use super::ExtQuery;
use crate::{
    api::{AppState, auth::AuthUser},
    core::kyc::{self, CheckReport, DocumentKind, KycForm},
    entities::KycSubmissionModel,
    errors::Result,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::Deserialize;

/// `GET /v1/kyc`: `null` until the caller saves a form or uploads a document
pub async fn get_own(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<KycSubmissionModel>>> {
    Ok(Json(kyc::get_submission(&state.db, user.id()).await?))
}

/// Save body: the form plus whether to submit it
#[derive(Debug, Deserialize)]
pub struct SaveBody {
    /// Form fields
    #[serde(flatten)]
    pub form: KycForm,
    /// Submit for review instead of saving a draft
    #[serde(default)]
    pub submit: bool,
}

/// `PUT /v1/kyc`
pub async fn save(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SaveBody>,
) -> Result<Json<KycSubmissionModel>> {
    let saved = kyc::save_submission(&state.db, user.id(), body.form, body.submit).await?;
    Ok(Json(saved))
}

/// `PUT /v1/kyc/documents/{kind}?ext` with the raw file as body
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<String>,
    Query(query): Query<ExtQuery>,
    body: Bytes,
) -> Result<Json<KycSubmissionModel>> {
    let kind: DocumentKind = kind.parse()?;
    let saved =
        kyc::upload_document(&state.db, &state.store, user.id(), kind, &query.ext, &body).await?;
    Ok(Json(saved))
}

/// `POST /v1/kyc/checks`
pub async fn run_checks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CheckReport>> {
    let report = kyc::run_checks(&state.db, &state.store, state.ocr.as_ref(), user.id()).await?;
    Ok(Json(report))
}
