//! Shipment business logic - Quote requests, tracking, customs assistance and the
//! document vault.

use crate::{
    core::status::{ContainerSize, CustomsScope, Lifecycle, Role, ShipmentStatus, update_where},
    entities::{CustomsRequest, Document, Shipment, customs_request, document, shipment},
    errors::{Error, Result},
    services::{Bucket, ObjectStore},
};
use chrono::NaiveDate;
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// A supported port of loading or discharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Port {
    /// UN/LOCODE
    pub code: &'static str,
    /// Display name
    pub name: &'static str,
}

/// Indian origin ports.
pub const INDIA_PORTS: [Port; 9] = [
    Port { code: "INNSA", name: "Nhava Sheva (JNPT), Mumbai" },
    Port { code: "INMUN", name: "Mundra, Gujarat" },
    Port { code: "INKOC", name: "Kochi (Cochin), Kerala" },
    Port { code: "INMAA", name: "Chennai, Tamil Nadu" },
    Port { code: "INKOL", name: "Kolkata (Kolkata/Haldia), West Bengal" },
    Port { code: "INVTZ", name: "Visakhapatnam, Andhra Pradesh" },
    Port { code: "INTUT", name: "Tuticorin (V.O. Chidambaranar), Tamil Nadu" },
    Port { code: "INHAZ", name: "Hazira, Gujarat" },
    Port { code: "INIXY", name: "Kandla/Deendayal, Gujarat" },
];

/// UAE destination ports.
pub const UAE_PORTS: [Port; 4] = [
    Port { code: "AEJEA", name: "Jebel Ali, Dubai" },
    Port { code: "AEKHL", name: "Khalifa Port, Abu Dhabi" },
    Port { code: "AEKLF", name: "Khor Fakkan, Sharjah" },
    Port { code: "AEFJR", name: "Fujairah" },
];

fn find_port(ports: &[Port], code: &str) -> Option<Port> {
    ports
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(code.trim()))
        .copied()
}

/// Looks up a supported port of loading by code (case-insensitive).
#[must_use]
pub fn find_origin_port(code: &str) -> Option<Port> {
    find_port(&INDIA_PORTS, code)
}

/// Looks up a supported port of discharge by code (case-insensitive).
#[must_use]
pub fn find_destination_port(code: &str) -> Option<Port> {
    find_port(&UAE_PORTS, code)
}

/// Booking form for a quote request
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentRequest {
    /// Port of loading (UN/LOCODE)
    pub origin_port: String,
    /// Port of discharge (UN/LOCODE)
    pub destination_port: String,
    /// Container size
    pub container_size: ContainerSize,
    /// Date the cargo is ready
    pub ready_date: NaiveDate,
    /// Customs clearance scope
    pub customs_scope: CustomsScope,
    /// Add cargo insurance
    #[serde(default)]
    pub insurance: bool,
    /// Add inland trucking
    #[serde(default)]
    pub trucking: bool,
    /// Add warehousing
    #[serde(default)]
    pub warehousing: bool,
    /// Commodity description
    pub commodity: Option<String>,
    /// Gross weight in kilograms
    pub weight_kg: Option<f64>,
    /// Volume in cubic metres
    pub volume_cbm: Option<f64>,
    /// Free-form notes
    pub notes: Option<String>,
}

fn validate_measure(value: Option<f64>, field: &str) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::validation(format!(
            "{field} must be a non-negative number"
        ))),
        other => Ok(other),
    }
}

/// Creates a shipment and sends it for quoting.
#[tracing::instrument(skip(db, request))]
pub async fn request_quote(
    db: &DatabaseConnection,
    user_id: &str,
    request: ShipmentRequest,
) -> Result<shipment::Model> {
    let origin = find_origin_port(&request.origin_port).ok_or_else(|| {
        Error::validation(format!("Unsupported origin port: {}", request.origin_port))
    })?;
    let destination = find_destination_port(&request.destination_port).ok_or_else(|| {
        Error::validation(format!(
            "Unsupported destination port: {}",
            request.destination_port
        ))
    })?;
    let weight_kg = validate_measure(request.weight_kg, "weight_kg")?;
    let volume_cbm = validate_measure(request.volume_cbm, "volume_cbm")?;
    let status = ShipmentStatus::Draft.transition(ShipmentStatus::QuoteRequested, Role::Owner)?;

    let now = chrono::Utc::now();
    let model = shipment::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        origin_port: Set(origin.code.to_string()),
        destination_port: Set(destination.code.to_string()),
        container_size: Set(request.container_size),
        ready_date: Set(request.ready_date),
        customs_scope: Set(request.customs_scope),
        insurance: Set(request.insurance),
        trucking: Set(request.trucking),
        warehousing: Set(request.warehousing),
        commodity: Set(crate::core::profile::non_empty(request.commodity)),
        weight_kg: Set(weight_kg),
        volume_cbm: Set(volume_cbm),
        notes: Set(crate::core::profile::non_empty(request.notes)),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model.insert(db).await?;
    tracing::info!(shipment_id = %created.id, user_id, "Shipment quote requested");
    Ok(created)
}

/// Shipments owned by a user, newest first.
pub async fn list_for_user(db: &DatabaseConnection, user_id: &str) -> Result<Vec<shipment::Model>> {
    Shipment::find()
        .filter(shipment::Column::UserId.eq(user_id))
        .order_by_desc(shipment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Shipments waiting for a quote, oldest first so the queue is worked in order.
pub async fn awaiting_quotes(db: &DatabaseConnection) -> Result<Vec<shipment::Model>> {
    Shipment::find()
        .filter(shipment::Column::Status.eq(ShipmentStatus::QuoteRequested))
        .order_by_asc(shipment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a shipment the viewer may see. Shipments owned by someone else are reported as
/// missing unless the viewer is an admin.
pub async fn get_for_viewer<C: ConnectionTrait>(
    db: &C,
    viewer_id: &str,
    is_admin: bool,
    shipment_id: &str,
) -> Result<shipment::Model> {
    Shipment::find_by_id(shipment_id.to_string())
        .one(db)
        .await?
        .filter(|s| is_admin || s.user_id == viewer_id)
        .ok_or_else(|| Error::not_found("shipment", shipment_id))
}

/// Cancels a shipment that has not been booked.
pub async fn cancel_shipment(
    db: &DatabaseConnection,
    viewer_id: &str,
    is_admin: bool,
    shipment_id: &str,
) -> Result<shipment::Model> {
    let existing = get_for_viewer(db, viewer_id, is_admin, shipment_id).await?;
    let role = if existing.user_id == viewer_id {
        Role::Owner
    } else {
        Role::Admin
    };
    let from = existing.status;
    let next = from.transition(ShipmentStatus::Cancelled, role)?;

    let mut active: shipment::ActiveModel = existing.into();
    active.status = Set(next);
    active.updated_at = Set(chrono::Utc::now());
    let guard = Condition::all()
        .add(shipment::Column::Id.eq(shipment_id))
        .add(shipment::Column::Status.eq(from));
    if update_where(db, active, guard).await? == 0 {
        return Err(from.rejected(next));
    }
    tracing::info!(shipment_id, "Shipment cancelled");
    get_for_viewer(db, viewer_id, is_admin, shipment_id).await
}

/// Files a customs assistance request, optionally tied to one of the user's shipments.
pub async fn create_customs_request(
    db: &DatabaseConnection,
    user_id: &str,
    shipment_id: Option<String>,
    scope: CustomsScope,
) -> Result<customs_request::Model> {
    let shipment_id = crate::core::profile::non_empty(shipment_id);
    if let Some(id) = shipment_id.as_deref() {
        get_for_viewer(db, user_id, false, id).await?;
    }

    let model = customs_request::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        shipment_id: Set(shipment_id),
        scope: Set(scope),
        status: Set("open".to_string()),
        created_at: Set(chrono::Utc::now()),
    };
    model.insert(db).await.map_err(Into::into)
}

/// Customs requests filed by a user, newest first.
pub async fn list_customs_requests(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<customs_request::Model>> {
    CustomsRequest::find()
        .filter(customs_request::Column::UserId.eq(user_id))
        .order_by_desc(customs_request::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Documents in a user's vault, newest first.
pub async fn list_documents(db: &DatabaseConnection, user_id: &str) -> Result<Vec<document::Model>> {
    Document::find()
        .filter(document::Column::UserId.eq(user_id))
        .order_by_desc(document::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lowercases and checks a file extension for use in an object key.
pub(crate) fn normalize_extension(ext: &str) -> Result<String> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::validation(format!("Unsupported file extension: {ext}")));
    }
    Ok(ext)
}

/// Random suffix for object keys created within the same millisecond.
pub(crate) fn object_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Stores a file in the private `documents` bucket and records it in the vault.
pub async fn upload_document(
    db: &DatabaseConnection,
    store: &ObjectStore,
    user_id: &str,
    shipment_id: Option<String>,
    title: &str,
    ext: &str,
    bytes: &[u8],
) -> Result<document::Model> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("Document title cannot be empty"));
    }
    if bytes.is_empty() {
        return Err(Error::validation("Uploaded file is empty"));
    }
    let shipment_id = crate::core::profile::non_empty(shipment_id);
    if let Some(id) = shipment_id.as_deref() {
        get_for_viewer(db, user_id, false, id).await?;
    }

    let now = chrono::Utc::now();
    let key = format!(
        "{user_id}/documents/{}-{}.{}",
        now.timestamp_millis(),
        object_suffix(),
        normalize_extension(ext)?
    );
    store.put(Bucket::Documents, &key, bytes).await?;

    let model = document::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        shipment_id: Set(shipment_id),
        title: Set(title.to_string()),
        path: Set(key.clone()),
        created_at: Set(now),
    };
    match model.insert(db).await {
        Ok(saved) => Ok(saved),
        Err(e) => {
            if let Err(cleanup) = store.remove(Bucket::Documents, &[key]).await {
                tracing::warn!(user_id, error = %cleanup, "Failed to remove orphaned document");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_find_port() {
        assert_eq!(
            find_origin_port("innsa").unwrap().name,
            "Nhava Sheva (JNPT), Mumbai"
        );
        assert_eq!(find_destination_port(" AEJEA ").unwrap().code, "AEJEA");
        assert!(find_origin_port("USNYC").is_none());
        assert!(find_origin_port("AEJEA").is_none());
        assert!(find_destination_port("INNSA").is_none());
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PDF").unwrap(), "pdf");
        assert!(normalize_extension("").is_err());
        assert!(normalize_extension("p/df").is_err());
        assert!(normalize_extension("toolong").is_err());
    }

    #[tokio::test]
    async fn test_request_quote() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_profile(&db, "shipper").await?;

        let created = create_test_shipment(&db, &user.id).await?;
        assert_eq!(created.status, ShipmentStatus::QuoteRequested);
        assert_eq!(created.origin_port, "INNSA");

        let listed = list_for_user(&db, &user.id).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(awaiting_quotes(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_quote_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_profile(&db, "shipper").await?;

        let same_port = ShipmentRequest {
            destination_port: "innsa".to_string(),
            ..test_shipment_request()
        };
        assert!(matches!(
            request_quote(&db, &user.id, same_port).await,
            Err(Error::Validation { .. })
        ));

        let reversed = ShipmentRequest {
            origin_port: "AEJEA".to_string(),
            destination_port: "INNSA".to_string(),
            ..test_shipment_request()
        };
        assert!(matches!(
            request_quote(&db, &user.id, reversed).await,
            Err(Error::Validation { .. })
        ));
        assert!(list_for_user(&db, &user.id).await?.is_empty());

        let unknown = ShipmentRequest {
            origin_port: "XXABC".to_string(),
            ..test_shipment_request()
        };
        assert!(matches!(
            request_quote(&db, &user.id, unknown).await,
            Err(Error::Validation { .. })
        ));

        let negative = ShipmentRequest {
            weight_kg: Some(-1.0),
            ..test_shipment_request()
        };
        assert!(matches!(
            request_quote(&db, &user.id, negative).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_tracking_visibility() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_profile(&db, "owner").await?;
        let other = create_test_profile(&db, "other").await?;
        let shipment = create_test_shipment(&db, &owner.id).await?;

        assert!(get_for_viewer(&db, &owner.id, false, &shipment.id).await.is_ok());
        assert!(get_for_viewer(&db, &other.id, true, &shipment.id).await.is_ok());
        assert!(matches!(
            get_for_viewer(&db, &other.id, false, &shipment.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_is_terminal() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_profile(&db, "owner").await?;
        let shipment = create_test_shipment(&db, &owner.id).await?;

        let cancelled = cancel_shipment(&db, &owner.id, false, &shipment.id).await?;
        assert_eq!(cancelled.status, ShipmentStatus::Cancelled);

        let again = cancel_shipment(&db, &owner.id, false, &shipment.id).await;
        assert!(matches!(again, Err(Error::InvalidTransition { .. })));
        assert!(awaiting_quotes(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_status_guard_skips_rows_changed_since_read() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_profile(&db, "owner").await?;
        let read = create_test_shipment(&db, &owner.id).await?;
        cancel_shipment(&db, &owner.id, false, &read.id).await?;

        // A write computed from the quote_requested row must not land on the cancelled one
        let mut active: shipment::ActiveModel = read.clone().into();
        active.status = Set(ShipmentStatus::QuoteReady);
        let guard = Condition::all()
            .add(shipment::Column::Id.eq(read.id.as_str()))
            .add(shipment::Column::Status.eq(read.status));
        assert_eq!(update_where(&db, active, guard).await?, 0);

        let stored = get_for_viewer(&db, &owner.id, false, &read.id).await?;
        assert_eq!(stored.status, ShipmentStatus::Cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn test_customs_request_requires_owned_shipment() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_profile(&db, "owner").await?;
        let other = create_test_profile(&db, "other").await?;
        let shipment = create_test_shipment(&db, &owner.id).await?;

        let request =
            create_customs_request(&db, &owner.id, Some(shipment.id.clone()), CustomsScope::Both)
                .await?;
        assert_eq!(request.status, "open");

        let general = create_customs_request(&db, &other.id, None, CustomsScope::Import).await?;
        assert!(general.shipment_id.is_none());

        let foreign =
            create_customs_request(&db, &other.id, Some(shipment.id), CustomsScope::Export).await;
        assert!(matches!(foreign, Err(Error::NotFound { .. })));
        assert_eq!(list_customs_requests(&db, &owner.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_document_vault() -> Result<()> {
        let db = setup_test_db().await?;
        let (_dir, store) = test_store()?;
        let owner = create_test_profile(&db, "owner").await?;

        let doc = upload_document(&db, &store, &owner.id, None, "Invoice", "pdf", b"%PDF-1.4")
            .await?;
        assert!(doc.path.starts_with(&format!("{}/documents/", owner.id)));
        assert!(doc.path.ends_with(".pdf"));
        assert_eq!(store.get(Bucket::Documents, &doc.path).await?, b"%PDF-1.4");

        let docs = list_documents(&db, &owner.id).await?;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Invoice");

        let empty = upload_document(&db, &store, &owner.id, None, "Empty", "pdf", b"").await;
        assert!(matches!(empty, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_document_insert_removes_object() -> Result<()> {
        let db = setup_test_db().await?;
        let (dir, store) = test_store()?;
        let owner = create_test_profile(&db, "owner").await?;

        db.clone().close().await?;
        let result =
            upload_document(&db, &store, &owner.id, None, "Invoice", "pdf", b"%PDF-1.4").await;
        assert!(matches!(result, Err(Error::Database(_))));

        let folder = dir.path().join("documents").join(&owner.id).join("documents");
        let left = match std::fs::read_dir(&folder) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        };
        assert_eq!(left, 0);
        Ok(())
    }
}
