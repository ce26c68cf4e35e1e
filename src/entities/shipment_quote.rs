//! Shipment quote entity - A priced offer for a shipment.
//!
//! Each cost component is stored in its own column; `total` is their sum.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipment quote database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipment_quotes")]
pub struct Model {
    /// Generated UUID of the quote
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Shipment the quote prices
    pub shipment_id: String,
    /// ISO currency code
    pub currency: String,
    /// Sum of all components
    pub total: f64,
    /// Ocean freight
    pub freight: f64,
    /// Cargo insurance
    pub insurance: f64,
    /// Inland trucking
    pub trucking: f64,
    /// Warehousing
    pub warehousing: f64,
    /// Customs clearance
    pub customs: f64,
    /// Quote expiry
    pub valid_until: DateTimeUtc,
    /// When the quote was generated
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ShipmentQuote` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each quote belongs to one shipment
    #[sea_orm(
        belongs_to = "super::shipment::Entity",
        from = "Column::ShipmentId",
        to = "super::shipment::Column::Id"
    )]
    Shipment,
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
