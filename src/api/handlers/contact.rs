use crate::{
    api::AppState,
    core::contact::{self, ContactForm},
    errors::Result,
};
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

/// `POST /v1/contact`; no authentication required
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<Value>)> {
    let lead = contact::submit_lead(&state.db, form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": lead.id }))))
}
