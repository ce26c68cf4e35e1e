//! Shipment entity - A freight booking request between two ports.

use crate::core::status::{ContainerSize, CustomsScope, ShipmentStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    /// Generated UUID of the shipment
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Shipper profile id
    pub user_id: String,
    /// UN/LOCODE of the port of loading
    pub origin_port: String,
    /// UN/LOCODE of the port of discharge
    pub destination_port: String,
    /// Container size the quote is based on
    pub container_size: ContainerSize,
    /// Date the cargo is ready
    pub ready_date: Date,
    /// Which side(s) of customs clearance are requested
    pub customs_scope: CustomsScope,
    /// Cargo insurance requested
    pub insurance: bool,
    /// Inland trucking requested
    pub trucking: bool,
    /// Warehousing requested
    pub warehousing: bool,
    /// Commodity description
    pub commodity: Option<String>,
    /// Gross weight in kilograms
    pub weight_kg: Option<f64>,
    /// Volume in cubic metres
    pub volume_cbm: Option<f64>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Lifecycle status
    pub status: ShipmentStatus,
    /// When the request was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Shipment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One shipment has many quotes
    #[sea_orm(has_many = "super::shipment_quote::Entity")]
    Quotes,
}

impl Related<super::shipment_quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
