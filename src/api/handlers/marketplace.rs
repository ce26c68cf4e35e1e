use crate::{
    api::{AppState, auth::AuthUser},
    core::listing::{self, SearchQuery, SellerCard},
    entities::ListingModel,
    errors::Result,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;

/// `GET /v1/marketplace/listings`
pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ListingModel>>> {
    let found = listing::search(&state.db, &state.config.marketplace, user.id(), &query).await?;
    Ok(Json(found))
}

/// `GET /v1/marketplace/sellers`
pub async fn sellers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SellerCard>>> {
    Ok(Json(listing::sellers(&state.db, user.id(), &query).await?))
}

/// Choice lists for listing forms
#[derive(Debug, Serialize)]
pub struct ListingOptions {
    /// Product categories
    pub categories: &'static [&'static str],
    /// Delivery terms
    pub incoterms: &'static [&'static str],
    /// Container options
    pub containers: &'static [&'static str],
    /// Packaging types
    pub pack_types: &'static [&'static str],
}

/// `GET /v1/marketplace/options`
pub async fn options() -> Json<ListingOptions> {
    Json(ListingOptions {
        categories: &listing::CATEGORIES,
        incoterms: &listing::INCOTERMS,
        containers: &listing::CONTAINERS,
        pack_types: &listing::PACK_TYPES,
    })
}
