//! HTTP API - axum router, shared state, authentication and handlers.
//!
//! Handlers are thin: they authenticate the caller, pull what they need out of the request
//! and delegate to [`crate::core`]. Errors become JSON responses via [`error`].

/// Bearer-token extractors
pub mod auth;
/// Error to response mapping
pub mod error;
/// Route handlers grouped by area
pub mod handlers;

use crate::{
    config::AppConfig,
    core::messaging::MessageFeed,
    services::{Mailer, ObjectStore, TextExtractor},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use handlers::{
    admin, contact, enquiries, kyc, listings, marketplace, messages, payments, profiles,
    shipments, storage,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Object storage
    pub store: Arc<ObjectStore>,
    /// Notification email
    pub mailer: Arc<dyn Mailer>,
    /// Document text extraction
    pub ocr: Arc<dyn TextExtractor>,
    /// Live message change feed
    pub feed: MessageFeed,
    /// Operations account that receives enquiry copies and has admin rights
    pub admin_user_id: Option<String>,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn healthz() -> &'static str {
    "ok"
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/profiles", post(profiles::sign_up))
        .route(
            "/v1/profiles/me",
            get(profiles::me).patch(profiles::update_me),
        )
        .route(
            "/v1/listings",
            get(listings::list_own).post(listings::create),
        )
        .route(
            "/v1/listings/{id}",
            get(listings::get_one)
                .patch(listings::update)
                .delete(listings::remove),
        )
        .route("/v1/listings/{id}/media", put(listings::upload_media))
        .route("/v1/marketplace/listings", get(marketplace::search))
        .route("/v1/marketplace/sellers", get(marketplace::sellers))
        .route("/v1/marketplace/options", get(marketplace::options))
        .route(
            "/v1/enquiries",
            get(enquiries::list).post(enquiries::create),
        )
        .route(
            "/v1/enquiries/{id}",
            axum::routing::patch(enquiries::update_status),
        )
        .route(
            "/v1/messages",
            get(messages::conversations).post(messages::send),
        )
        .route("/v1/messages/with/{partner}", get(messages::conversation))
        .route(
            "/v1/messages/with/{partner}/read",
            post(messages::mark_read),
        )
        .route("/v1/messages/stream", get(messages::stream))
        .route("/v1/kyc", get(kyc::get_own).put(kyc::save))
        .route("/v1/kyc/documents/{kind}", put(kyc::upload_document))
        .route("/v1/kyc/checks", post(kyc::run_checks))
        .route("/v1/storage/signed", get(storage::signed))
        .route("/v1/storage/object", get(storage::object))
        .route("/v1/storage/public/{*key}", get(storage::public_object))
        .route(
            "/v1/admin/kyc",
            get(admin::kyc_queue).post(admin::set_kyc_status),
        )
        .route("/v1/admin/kyc/approved", get(admin::kyc_approved))
        .route(
            "/v1/admin/kyc/{id}/requests",
            post(admin::request_kyc_documents),
        )
        .route("/v1/admin/kyc/{id}/logs", get(admin::kyc_logs))
        .route(
            "/v1/admin/quotes",
            get(admin::awaiting_quotes).post(admin::generate_quote),
        )
        .route(
            "/v1/admin/payments/{id}/schedule",
            post(admin::schedule_payment),
        )
        .route(
            "/v1/admin/payments/{id}/release",
            post(admin::release_payment),
        )
        .route("/v1/admin/payments/{id}/refund", post(admin::refund_payment))
        .route(
            "/v1/admin/payments/{id}/resolve",
            post(admin::resolve_payment),
        )
        .route("/v1/admin/leads", get(admin::leads))
        .route(
            "/v1/shipments",
            get(shipments::list_own).post(shipments::request_quote),
        )
        .route("/v1/shipments/{id}", get(shipments::track))
        .route("/v1/shipments/{id}/quote", get(shipments::latest_quote))
        .route("/v1/shipments/{id}/cancel", post(shipments::cancel))
        .route(
            "/v1/customs-requests",
            get(shipments::list_customs_requests).post(shipments::create_customs_request),
        )
        .route(
            "/v1/documents",
            get(shipments::list_documents).put(shipments::upload_document),
        )
        .route("/v1/ports", get(shipments::ports))
        .route(
            "/v1/payments",
            get(payments::list_own).post(payments::pay_and_book),
        )
        .route("/v1/payments/{id}/dispute", post(payments::dispute))
        .route("/v1/contact", post(contact::submit))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests;
