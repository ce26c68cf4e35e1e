//! Listing entity - A product a seller offers on the marketplace.
//!
//! Photos and videos are stored as JSON arrays of `{ "url": ... }` objects pointing into
//! the public `listings` storage bucket.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Listing database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    /// Generated UUID of the listing
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Seller profile id
    pub user_id: String,
    /// Product name
    pub name: String,
    /// Harmonised System of Nomenclature code
    pub hsn_code: Option<String>,
    /// Marketplace category (e.g. "Agriculture")
    pub category: String,
    /// Free-form sub-category
    pub sub_category: Option<String>,
    /// Container type the product ships in
    pub container: Option<String>,
    /// Packaging size, e.g. "25 kg"
    pub packaging_size: Option<String>,
    /// Packaging type, e.g. "Bag"
    pub packaging_type: Option<String>,
    /// Origin (city / country)
    pub origin: Option<String>,
    /// Incoterm the price is quoted under
    pub delivery_terms: Option<String>,
    /// Lead time, e.g. "7-10 days"
    pub lead_time: Option<String>,
    /// Unit price
    pub price: Option<f64>,
    /// Unit the price applies to, e.g. "per kg"
    pub price_unit: Option<String>,
    /// Units in stock
    pub stock: Option<f64>,
    /// Minimum order quantity, free text
    pub min_order_qty: Option<String>,
    /// Payment terms text
    pub payment_terms: Option<String>,
    /// Photo media, JSON array of `{ "url": ... }`
    pub photos: Json,
    /// Video media, JSON array of `{ "url": ... }`
    pub videos: Json,
    /// When the listing was created
    pub created_at: DateTimeUtc,
    /// When the listing was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Listing and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each listing belongs to one seller profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Seller,
    /// One listing receives many enquiries
    #[sea_orm(has_many = "super::enquiry::Entity")]
    Enquiries,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::enquiry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enquiries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
