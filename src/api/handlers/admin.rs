use crate::{
    api::{AppState, auth::AdminUser},
    core::{contact, kyc, payment, quote, shipment, status::KycStatus},
    entities::{
        KycLogModel, KycSubmissionModel, LeadModel, PaymentModel, ShipmentModel,
        ShipmentQuoteModel,
    },
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `GET /v1/admin/kyc`: review queue
pub async fn kyc_queue(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<KycSubmissionModel>>> {
    Ok(Json(kyc::review_queue(&state.db).await?))
}

/// `GET /v1/admin/kyc/approved`
pub async fn kyc_approved(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<KycSubmissionModel>>> {
    Ok(Json(kyc::approved_submissions(&state.db).await?))
}

/// Review decision
#[derive(Debug, Deserialize)]
pub struct KycDecision {
    /// Submission id
    pub kyc_id: String,
    /// New status
    pub status: KycStatus,
}

/// `POST /v1/admin/kyc`
pub async fn set_kyc_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(decision): Json<KycDecision>,
) -> Result<Json<KycSubmissionModel>> {
    let updated = kyc::set_status(
        &state.db,
        state.mailer.as_ref(),
        &state.config.email.team,
        admin.id(),
        &decision.kyc_id,
        decision.status,
    )
    .await?;
    Ok(Json(updated))
}

/// Requested document note
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    /// What the reviewer needs
    pub note: String,
}

/// `POST /v1/admin/kyc/{id}/requests`
pub async fn request_kyc_documents(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<DocumentRequest>,
) -> Result<Json<KycSubmissionModel>> {
    Ok(Json(kyc::request_documents(&state.db, &id, &body.note).await?))
}

/// `GET /v1/admin/kyc/{id}/logs`
pub async fn kyc_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<KycLogModel>>> {
    Ok(Json(kyc::audit_log(&state.db, &id).await?))
}

/// `GET /v1/admin/quotes`: shipments waiting for a quote
pub async fn awaiting_quotes(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<ShipmentModel>>> {
    Ok(Json(shipment::awaiting_quotes(&state.db).await?))
}

/// Quote generation body
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    /// Shipment to price
    pub shipment_id: String,
}

/// `POST /v1/admin/quotes`
pub async fn generate_quote(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<QuoteRequest>,
) -> Result<(StatusCode, Json<ShipmentQuoteModel>)> {
    let generated =
        quote::generate_quote(&state.db, &state.config.quote, &body.shipment_id, Utc::now())
            .await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

/// Release schedule body
#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
    /// When the funds should be released
    pub release_at: DateTime<Utc>,
}

/// `POST /v1/admin/payments/{id}/schedule`
pub async fn schedule_payment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<PaymentModel>> {
    let updated = payment::schedule_release(&state.db, &id, body.release_at, Utc::now()).await?;
    Ok(Json(updated))
}

/// `POST /v1/admin/payments/{id}/release`
pub async fn release_payment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentModel>> {
    Ok(Json(payment::release(&state.db, &id).await?))
}

/// `POST /v1/admin/payments/{id}/refund`
pub async fn refund_payment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentModel>> {
    Ok(Json(payment::refund(&state.db, &id).await?))
}

/// `POST /v1/admin/payments/{id}/resolve`
pub async fn resolve_payment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentModel>> {
    Ok(Json(payment::resolve_dispute(&state.db, &id).await?))
}

/// `GET /v1/admin/leads`
pub async fn leads(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<LeadModel>>> {
    Ok(Json(contact::list_leads(&state.db).await?))
}
