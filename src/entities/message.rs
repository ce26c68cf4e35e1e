//! Message entity - Direct messages between two accounts.
//!
//! Enquiry fan-out also writes here: `is_enquiry` marks those rows and `is_admin_copy`
//! marks the copy sent to the admin account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    /// Generated UUID of the message
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Sending profile id
    pub sender_id: String,
    /// Receiving profile id
    pub receiver_id: String,
    /// Message text
    pub content: String,
    /// Whether the receiver has read it
    pub read: bool,
    /// Written by the enquiry fan-out
    pub is_enquiry: bool,
    /// Enquiry the message was created for
    pub enquiry_id: Option<String>,
    /// Copy delivered to the admin account
    pub is_admin_copy: bool,
    /// When the message was sent
    pub created_at: DateTimeUtc,
}

/// `Message` has no relationships mapped
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
