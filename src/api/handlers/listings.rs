use crate::{
    api::{AppState, auth::AuthUser},
    core::{
        kyc,
        listing::{self, ListingInput, ListingUpdate, MediaKind},
    },
    entities::ListingModel,
    errors::Result,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// `GET /v1/listings`
pub async fn list_own(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ListingModel>>> {
    Ok(Json(listing::list_for_seller(&state.db, user.id()).await?))
}

/// `POST /v1/listings`
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ListingInput>,
) -> Result<(StatusCode, Json<ListingModel>)> {
    let created =
        listing::create_listing(&state.db, &state.config.marketplace, user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /v1/listings/{id}`: sellers see their own listings, everyone else needs approved
/// KYC.
pub async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ListingModel>> {
    let found = listing::get_listing(&state.db, &id).await?;
    if found.user_id != user.id() && !user.is_admin {
        kyc::require_approved(&state.db, user.id()).await?;
    }
    Ok(Json(found))
}

/// `PATCH /v1/listings/{id}`
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(changes): Json<ListingUpdate>,
) -> Result<Json<ListingModel>> {
    let updated =
        listing::update_listing(&state.db, &state.store, user.id(), &id, changes).await?;
    Ok(Json(updated))
}

/// `DELETE /v1/listings/{id}`
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    listing::delete_listing(&state.db, &state.store, user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `?kind=photo|video&ext=jpg`
#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    /// Photo or video
    pub kind: MediaKind,
    /// File extension
    pub ext: String,
}

/// `PUT /v1/listings/{id}/media?kind&ext` with the raw file as body
pub async fn upload_media(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<MediaQuery>,
    body: Bytes,
) -> Result<Json<ListingModel>> {
    let updated = listing::add_media(
        &state.db,
        &state.store,
        &state.config.marketplace,
        user.id(),
        &id,
        query.kind,
        &query.ext,
        &body,
    )
    .await?;
    Ok(Json(updated))
}
