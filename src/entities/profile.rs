//! Profile entity - One row per marketplace account.
//!
//! Profiles carry the public company details shown to counterparties, the admin flag,
//! and the bearer token the API authenticates with.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Generated UUID of the account
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Contact name of the account holder
    pub name: String,
    /// Login email, unique across accounts
    #[sea_orm(unique)]
    pub email: String,
    /// Trading name shown in the marketplace and messages
    pub company_name: Option<String>,
    /// Country of registration
    pub country: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Whether the account may use the admin routes
    pub is_admin: bool,
    /// Bearer token used to authenticate API requests
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub api_token: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// `Profile` is referenced by other tables but owns no foreign keys itself
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One profile owns many listings
    #[sea_orm(has_many = "super::listing::Entity")]
    Listings,
}

impl Related<super::listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
