//! Payment entity - Escrow payments against an order (a booked shipment).

use crate::core::status::PaymentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Generated UUID of the payment
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Paying profile id
    pub user_id: String,
    /// Order the payment settles (shipment id)
    pub order_id: String,
    /// Amount held in escrow
    pub amount: f64,
    /// ISO currency code
    pub currency: String,
    /// Escrow status
    pub status: PaymentStatus,
    /// Scheduled release time, set when status is `scheduled`
    pub release_at: Option<DateTimeUtc>,
    /// Reason given when a dispute was opened
    pub dispute_reason: Option<String>,
    /// When the payment was created
    pub created_at: DateTimeUtc,
    /// When the payment was last modified
    pub updated_at: DateTimeUtc,
}

/// `Payment` has no relationships mapped
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
