//! KYC submission entity - Identity and business documents for one account.
//!
//! There is at most one row per user (`user_id` is unique). Document columns hold object
//! paths inside the private `kyc-docs` bucket.

use crate::core::status::KycStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// KYC submission database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kyc_submissions")]
pub struct Model {
    /// Generated UUID of the submission
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning profile id, unique
    #[sea_orm(unique)]
    pub user_id: String,
    /// Full legal name as per PAN / Aadhaar
    pub name: String,
    /// Registered address
    pub address: Option<String>,
    /// Legal business name
    pub company_name: Option<String>,
    /// 12-digit Aadhaar number
    pub aadhaar_number: Option<String>,
    /// 10-character PAN
    pub pan_number: Option<String>,
    /// Importer-exporter code
    pub iec_code: Option<String>,
    /// GST registration number
    pub gstin: Option<String>,
    /// Storage path of the Aadhaar front image
    pub doc_aadhaar_front: Option<String>,
    /// Storage path of the Aadhaar back image
    pub doc_aadhaar_back: Option<String>,
    /// Storage path of the PAN card image
    pub doc_pan: Option<String>,
    /// Storage path of the IEC certificate
    pub doc_iec: Option<String>,
    /// Storage path of the GST certificate
    pub doc_gstin: Option<String>,
    /// Numbers read from the document images
    pub ai_extracted: Json,
    /// Review flags, JSON `{ "issues": [...] }`
    pub flags: Json,
    /// Lifecycle status
    pub status: KycStatus,
    /// Additional documents requested by the compliance team, JSON array of strings
    pub requested_docs: Json,
    /// When the row was first written
    pub created_at: DateTimeUtc,
    /// When the row was last written
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `KycSubmission` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One submission has many audit log rows
    #[sea_orm(has_many = "super::kyc_log::Entity")]
    Logs,
}

impl Related<super::kyc_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
