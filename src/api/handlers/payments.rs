use crate::{
    api::{AppState, auth::AuthUser},
    core::payment::{self, PaymentSummary},
    entities::PaymentModel,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

/// `GET /v1/payments`: the caller's payments grouped by escrow state
pub async fn list_own(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PaymentSummary>> {
    let payments = payment::list_for_user(&state.db, user.id()).await?;
    Ok(Json(payment::summarize(payments)))
}

/// Pay & book body
#[derive(Debug, Deserialize)]
pub struct PayBody {
    /// Quoted shipment to book
    pub shipment_id: String,
}

/// `POST /v1/payments`
pub async fn pay_and_book(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<PayBody>,
) -> Result<(StatusCode, Json<PaymentModel>)> {
    let created =
        payment::pay_and_book(&state.db, user.id(), &body.shipment_id, chrono::Utc::now())
            .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Dispute body
#[derive(Debug, Deserialize)]
pub struct DisputeBody {
    /// Why the payer disputes the order
    pub reason: String,
}

/// `POST /v1/payments/{id}/dispute`
pub async fn dispute(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<DisputeBody>,
) -> Result<Json<PaymentModel>> {
    let updated = payment::open_dispute(&state.db, user.id(), &id, &body.reason).await?;
    Ok(Json(updated))
}
