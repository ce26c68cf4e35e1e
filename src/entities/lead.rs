//! Lead entity - Contact form submissions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lead database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sender name
    pub name: Option<String>,
    /// Sender email
    pub email: Option<String>,
    /// Message body
    pub message: String,
    /// When the form was submitted
    pub created_at: DateTimeUtc,
}

/// `Lead` has no relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
