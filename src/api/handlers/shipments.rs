use crate::{
    api::{AppState, auth::AuthUser},
    core::{
        quote::{self, QuoteBreakdown},
        shipment::{self, INDIA_PORTS, Port, ShipmentRequest, UAE_PORTS},
        status::CustomsScope,
    },
    entities::{CustomsRequestModel, DocumentModel, ShipmentModel, ShipmentQuoteModel},
    errors::{Error, Result},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// `GET /v1/shipments`
pub async fn list_own(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ShipmentModel>>> {
    Ok(Json(shipment::list_for_user(&state.db, user.id()).await?))
}

/// Shipment plus an indicative price from the current rate card
#[derive(Debug, Serialize)]
pub struct RequestedShipment {
    /// The stored shipment
    pub shipment: ShipmentModel,
    /// Indicative price; the binding quote is issued by operations
    pub estimate: QuoteBreakdown,
    /// Estimate total
    pub estimate_total: f64,
}

/// `POST /v1/shipments`
pub async fn request_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ShipmentRequest>,
) -> Result<(StatusCode, Json<RequestedShipment>)> {
    let created = shipment::request_quote(&state.db, user.id(), request).await?;
    let estimate = quote::breakdown_for(&state.config.quote, &created);
    Ok((
        StatusCode::CREATED,
        Json(RequestedShipment {
            shipment: created,
            estimate_total: estimate.total(),
            estimate,
        }),
    ))
}

/// `GET /v1/shipments/{id}`
pub async fn track(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ShipmentModel>> {
    let found = shipment::get_for_viewer(&state.db, user.id(), user.is_admin, &id).await?;
    Ok(Json(found))
}

/// `GET /v1/shipments/{id}/quote`
pub async fn latest_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ShipmentQuoteModel>> {
    shipment::get_for_viewer(&state.db, user.id(), user.is_admin, &id).await?;
    quote::latest_quote(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("quote", id))
}

/// `POST /v1/shipments/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ShipmentModel>> {
    let cancelled = shipment::cancel_shipment(&state.db, user.id(), user.is_admin, &id).await?;
    Ok(Json(cancelled))
}

/// Customs assistance body
#[derive(Debug, Deserialize)]
pub struct CustomsBody {
    /// Optional shipment the request relates to
    pub shipment_id: Option<String>,
    /// Clearance scope
    pub scope: CustomsScope,
}

/// `POST /v1/customs-requests`
pub async fn create_customs_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CustomsBody>,
) -> Result<(StatusCode, Json<CustomsRequestModel>)> {
    let created =
        shipment::create_customs_request(&state.db, user.id(), body.shipment_id, body.scope)
            .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /v1/customs-requests`
pub async fn list_customs_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CustomsRequestModel>>> {
    Ok(Json(
        shipment::list_customs_requests(&state.db, user.id()).await?,
    ))
}

/// `GET /v1/documents`
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<DocumentModel>>> {
    Ok(Json(shipment::list_documents(&state.db, user.id()).await?))
}

/// `?title&ext&shipment_id`
#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    /// Display title
    pub title: String,
    /// File extension
    pub ext: String,
    /// Optional related shipment
    pub shipment_id: Option<String>,
}

/// `PUT /v1/documents?title&ext&shipment_id` with the raw file as body
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DocumentQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentModel>)> {
    let stored = shipment::upload_document(
        &state.db,
        &state.store,
        user.id(),
        query.shipment_id,
        &query.title,
        &query.ext,
        &body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Supported ports
#[derive(Debug, Serialize)]
pub struct Ports {
    /// Ports of loading
    pub origin: &'static [Port],
    /// Ports of discharge
    pub destination: &'static [Port],
}

/// `GET /v1/ports`
pub async fn ports() -> Json<Ports> {
    Json(Ports {
        origin: &INDIA_PORTS,
        destination: &UAE_PORTS,
    })
}
