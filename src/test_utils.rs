//! Shared test utilities for the marketplace backend.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::StorageConfig,
    core::{
        listing::{self, ListingInput},
        profile::{self, NewProfile},
        shipment::{self, ShipmentRequest},
        status::{ContainerSize, CustomsScope, KycStatus},
    },
    entities::{self, kyc_submission},
    errors::Result,
    services::{EmailMessage, Mailer, ObjectStore},
};
use futures::future::BoxFuture;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::{Arc, Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test profile.
///
/// # Defaults
/// * `email`: `"{name}@example.com"`
/// * `company_name`: `"{name} Trading"`
/// * `country`: `"India"`
pub async fn create_test_profile(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::profile::Model> {
    profile::create_profile(
        db,
        NewProfile {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            company_name: Some(format!("{name} Trading")),
            country: Some("India".to_string()),
        },
    )
    .await
}

/// Creates a profile with the admin flag set.
pub async fn create_admin_profile(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::profile::Model> {
    let created = create_test_profile(db, name).await?;
    let mut active: entities::profile::ActiveModel = created.into();
    active.is_admin = Set(true);
    Ok(active.update(db).await?)
}

/// Inserts an already-approved KYC submission for `user_id`, bypassing review.
pub async fn approve_test_kyc(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<entities::kyc_submission::Model> {
    let now = chrono::Utc::now();
    let model = kyc_submission::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        name: Set("Approved Trader".to_string()),
        address: Set(None),
        company_name: Set(None),
        aadhaar_number: Set(None),
        pan_number: Set(None),
        iec_code: Set(None),
        gstin: Set(None),
        doc_aadhaar_front: Set(None),
        doc_aadhaar_back: Set(None),
        doc_pan: Set(None),
        doc_iec: Set(None),
        doc_gstin: Set(None),
        ai_extracted: Set(serde_json::json!({})),
        flags: Set(serde_json::json!({ "issues": [] })),
        status: Set(KycStatus::Approved),
        requested_docs: Set(serde_json::json!([])),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

/// Creates a seller with approved KYC.
pub async fn create_verified_seller(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::profile::Model> {
    let seller = create_test_profile(db, name).await?;
    approve_test_kyc(db, &seller.id).await?;
    Ok(seller)
}

/// Listing input with sensible defaults.
///
/// # Defaults
/// * `category`: `"Agriculture"`
/// * `origin`: `"India"`
/// * `price`: 1200.0 per `"MT"`
/// * `delivery_terms`: `"FOB"`
#[must_use]
pub fn test_listing_input(name: &str) -> ListingInput {
    ListingInput {
        name: name.to_string(),
        category: Some("Agriculture".to_string()),
        origin: Some("India".to_string()),
        price: Some(1200.0),
        price_unit: Some("MT".to_string()),
        delivery_terms: Some("FOB".to_string()),
        ..Default::default()
    }
}

/// Creates a listing for an already-verified seller.
pub async fn create_test_listing(
    db: &DatabaseConnection,
    seller_id: &str,
    name: &str,
) -> Result<entities::listing::Model> {
    listing::create_listing(
        db,
        &crate::config::settings::MarketplaceConfig::default(),
        seller_id,
        test_listing_input(name),
    )
    .await
}

/// Shipment request with sensible defaults: a 40ft container from Nhava Sheva to Jebel Ali
/// with insurance, export customs and no trucking or warehousing.
#[must_use]
pub fn test_shipment_request() -> ShipmentRequest {
    ShipmentRequest {
        origin_port: "INNSA".to_string(),
        destination_port: "AEJEA".to_string(),
        container_size: ContainerSize::Forty,
        ready_date: chrono::NaiveDate::from_ymd_opt(2030, 1, 15).unwrap_or_default(),
        customs_scope: CustomsScope::Export,
        insurance: true,
        trucking: false,
        warehousing: false,
        commodity: Some("Turmeric".to_string()),
        weight_kg: Some(18_000.0),
        volume_cbm: None,
        notes: None,
    }
}

/// Creates a shipment in `quote_requested` for `user_id`.
pub async fn create_test_shipment(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<entities::shipment::Model> {
    shipment::request_quote(db, user_id, test_shipment_request()).await
}

/// Object store rooted in a fresh temporary directory. Keep the returned guard alive for
/// the duration of the test.
pub fn test_store() -> Result<(tempfile::TempDir, ObjectStore)> {
    let dir = tempfile::tempdir()?;
    let config = StorageConfig {
        root: dir.path().to_path_buf(),
        signing_key: "test-signing-key".to_string(),
        ..Default::default()
    };
    let store = ObjectStore::new(&config);
    Ok((dir, store))
}

/// Mailer that records messages instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose sends always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    /// Messages recorded so far.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.fail {
                return Err(crate::errors::Error::Email {
                    message: "mail relay unavailable".to_string(),
                });
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(message);
            }
            Ok(())
        })
    }
}
