//! Enquiry entity - A buyer's request for an offer on a listing.

use crate::core::status::EnquiryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enquiry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enquiries")]
pub struct Model {
    /// Generated UUID of the enquiry
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Listing asked about
    pub listing_id: String,
    /// Buyer profile id
    pub buyer_id: String,
    /// Seller profile id, copied from the listing
    pub seller_id: String,
    /// Enquiry text
    pub message: String,
    /// Requested quantity, free text
    pub quantity: Option<String>,
    /// Port the buyer wants delivery to
    pub destination_port: Option<String>,
    /// Requested packaging
    pub packaging: Option<String>,
    /// Requested Incoterm
    pub delivery_terms: Option<String>,
    /// Requested payment terms
    pub payment_terms: Option<String>,
    /// Buyer's target unit price
    pub target_price: Option<f64>,
    /// Lifecycle status
    pub status: EnquiryStatus,
    /// When the enquiry was sent
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Enquiry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each enquiry belongs to one listing
    #[sea_orm(
        belongs_to = "super::listing::Entity",
        from = "Column::ListingId",
        to = "super::listing::Column::Id"
    )]
    Listing,
}

impl Related<super::listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
