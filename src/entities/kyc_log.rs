//! KYC audit log entity - One row per admin status decision.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// KYC audit log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kyc_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Submission the decision applies to
    pub kyc_id: String,
    /// Admin profile that made the decision
    pub admin_id: String,
    /// Status the submission was moved to
    pub action: String,
    /// When the decision was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `KycLog` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each log row belongs to one submission
    #[sea_orm(
        belongs_to = "super::kyc_submission::Entity",
        from = "Column::KycId",
        to = "super::kyc_submission::Column::Id"
    )]
    Submission,
}

impl Related<super::kyc_submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
