//! Document entity - Trade documents kept in a user's document vault.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Generated UUID of the document
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning profile id
    pub user_id: String,
    /// Shipment the document belongs to, if any
    pub shipment_id: Option<String>,
    /// Display title, e.g. "Bill of Lading"
    pub title: String,
    /// Storage path of the file
    pub path: String,
    /// When the document was added
    pub created_at: DateTimeUtc,
}

/// `Document` has no relationships mapped
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
