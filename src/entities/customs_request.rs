//! Customs request entity - A request for customs documentation and filing assistance.

use crate::core::status::CustomsScope;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customs request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customs_requests")]
pub struct Model {
    /// Generated UUID of the request
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Requesting profile id
    pub user_id: String,
    /// Shipment the request is linked to, if any
    pub shipment_id: Option<String>,
    /// Import, export or both
    pub scope: CustomsScope,
    /// `"open"` until handled by the team
    pub status: String,
    /// When the request was made
    pub created_at: DateTimeUtc,
}

/// `CustomsRequest` has no relationships mapped
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
