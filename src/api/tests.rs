#![allow(clippy::unwrap_used)]

use super::*;
use crate::{
    core::messaging::MessageFeed,
    errors::Result,
    services::PlainTextExtractor,
    test_utils::{
        RecordingMailer, approve_test_kyc, create_admin_profile, create_test_profile,
        create_verified_seller, setup_test_db, test_store,
    },
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    _dir: tempfile::TempDir,
}

async fn test_app() -> Result<TestApp> {
    let db = setup_test_db().await?;
    let (dir, store) = test_store()?;
    let state = AppState {
        db: db.clone(),
        config: Arc::new(AppConfig::default()),
        store: Arc::new(store),
        mailer: Arc::new(RecordingMailer::default()),
        ocr: Arc::new(PlainTextExtractor),
        feed: MessageFeed::default(),
        admin_user_id: None,
    };
    Ok(TestApp {
        router: build_router(state),
        db,
        _dir: dir,
    })
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> Response {
    app.router.clone().oneshot(req).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz() -> Result<()> {
    let app = test_app().await?;
    let response = send(&app, request("GET", "/healthz", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_sign_up_then_me() -> Result<()> {
    let app = test_app().await?;
    let response = send(
        &app,
        request(
            "POST",
            "/v1/profiles",
            None,
            Some(json!({ "name": "Asha", "email": "Asha@Example.com" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let token = created["api_token"].as_str().unwrap().to_string();
    assert!(created["profile"].get("api_token").is_none());

    let response = send(&app, request("GET", "/v1/profiles/me", Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["email"], "asha@example.com");
    assert_eq!(me["is_admin"], false);
    Ok(())
}

#[tokio::test]
async fn test_missing_or_unknown_token_is_unauthorized() -> Result<()> {
    let app = test_app().await?;

    let response = send(&app, request("GET", "/v1/profiles/me", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "unauthorized");

    let response = send(
        &app,
        request("GET", "/v1/profiles/me", Some("exr_bogus"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() -> Result<()> {
    let app = test_app().await?;
    let user = create_test_profile(&app.db, "buyer").await?;
    let admin = create_admin_profile(&app.db, "ops").await?;

    let response = send(
        &app,
        request("GET", "/v1/admin/kyc", Some(&user.api_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["code"], "forbidden");

    let response = send(
        &app,
        request("GET", "/v1/admin/kyc", Some(&admin.api_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_marketplace_requires_approved_kyc() -> Result<()> {
    let app = test_app().await?;
    let seller = create_verified_seller(&app.db, "seller").await?;
    crate::test_utils::create_test_listing(&app.db, &seller.id, "Basmati Rice").await?;
    let buyer = create_test_profile(&app.db, "buyer").await?;

    let uri = "/v1/marketplace/listings?q=basmati";
    let response = send(&app, request("GET", uri, Some(&buyer.api_token), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["code"], "kyc_required");

    approve_test_kyc(&app.db, &buyer.id).await?;
    let response = send(&app, request("GET", uri, Some(&buyer.api_token), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let found = body_json(response).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_quote_to_booking_flow() -> Result<()> {
    let app = test_app().await?;
    let shipper = create_test_profile(&app.db, "shipper").await?;
    let admin = create_admin_profile(&app.db, "ops").await?;

    let response = send(
        &app,
        request(
            "POST",
            "/v1/shipments",
            Some(&shipper.api_token),
            Some(json!({
                "origin_port": "INNSA",
                "destination_port": "AEJEA",
                "container_size": "40ft",
                "ready_date": "2030-01-15",
                "customs_scope": "both",
                "insurance": true,
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let shipment_id = created["shipment"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["shipment"]["status"], "quote_requested");

    let response = send(
        &app,
        request(
            "POST",
            "/v1/admin/quotes",
            Some(&admin.api_token),
            Some(json!({ "shipment_id": shipment_id })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let pay = json!({ "shipment_id": shipment_id });
    let response = send(
        &app,
        request("POST", "/v1/payments", Some(&shipper.api_token), Some(pay.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    approve_test_kyc(&app.db, &shipper.id).await?;
    let response = send(
        &app,
        request("POST", "/v1/payments", Some(&shipper.api_token), Some(pay)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["status"], "in_progress");

    let response = send(
        &app,
        request(
            "GET",
            &format!("/v1/shipments/{shipment_id}"),
            Some(&shipper.api_token),
            None,
        ),
    )
    .await;
    assert_eq!(body_json(response).await["status"], "booked");
    Ok(())
}

#[tokio::test]
async fn test_other_users_shipment_is_not_found() -> Result<()> {
    let app = test_app().await?;
    let owner = create_test_profile(&app.db, "owner").await?;
    let other = create_test_profile(&app.db, "other").await?;
    let shipment = crate::test_utils::create_test_shipment(&app.db, &owner.id).await?;

    let response = send(
        &app,
        request(
            "GET",
            &format!("/v1/shipments/{}", shipment.id),
            Some(&other.api_token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_ports_are_public() -> Result<()> {
    let app = test_app().await?;
    let response = send(&app, request("GET", "/v1/ports", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ports = body_json(response).await;
    assert_eq!(ports["origin"][0]["code"], "INNSA");
    assert_eq!(ports["destination"].as_array().unwrap().len(), 4);
    Ok(())
}
