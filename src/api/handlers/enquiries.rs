use crate::{
    api::{AppState, auth::AuthUser},
    core::{
        enquiry::{self, EnquiryFanOut, EnquiryRequest},
        status::EnquiryStatus,
    },
    entities::EnquiryModel,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// Enquiries the caller received as seller and sent as buyer
#[derive(Debug, Serialize)]
pub struct EnquiryLists {
    /// Received as seller
    pub received: Vec<EnquiryModel>,
    /// Sent as buyer
    pub sent: Vec<EnquiryModel>,
}

/// `GET /v1/enquiries`
pub async fn list(State(state): State<AppState>, user: AuthUser) -> Result<Json<EnquiryLists>> {
    Ok(Json(EnquiryLists {
        received: enquiry::list_received(&state.db, user.id()).await?,
        sent: enquiry::list_sent(&state.db, user.id()).await?,
    }))
}

/// `POST /v1/enquiries`
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<EnquiryRequest>,
) -> Result<(StatusCode, Json<EnquiryFanOut>)> {
    let out = enquiry::create_enquiry(
        &state.db,
        &state.feed,
        user.id(),
        state.admin_user_id.as_deref(),
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(out)))
}

/// Status change body
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    /// New status
    pub status: EnquiryStatus,
}

/// `PATCH /v1/enquiries/{id}`
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<EnquiryModel>> {
    let updated = enquiry::update_status(&state.db, user.id(), &id, body.status).await?;
    Ok(Json(updated))
}
