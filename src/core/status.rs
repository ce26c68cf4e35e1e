//! Status enumerations and the lifecycles that govern them.
//!
//! Every status change in the crate goes through [`Lifecycle::transition`], so the allowed
//! moves for each entity, and who may make them, live in this one file. The enums are
//! stored as strings in the database via `DeriveActiveEnum`.

use crate::errors::{Error, Result};
use sea_orm::{Condition, QueryFilter, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The account that owns the record (submitter, shipper, payer, or listing seller)
    Owner,
    /// A compliance / operations admin
    Admin,
}

/// Shared behaviour of the status enums.
pub trait Lifecycle: Copy + PartialEq + Sized {
    /// Entity name used in error messages
    const ENTITY: &'static str;

    /// Database / wire representation
    fn as_str(self) -> &'static str;

    /// Whether `role` may move a record from `self` to `to`.
    fn allows(self, to: Self, role: Role) -> bool;

    /// Validates a transition, returning the new status or [`Error::InvalidTransition`].
    fn transition(self, to: Self, role: Role) -> Result<Self> {
        if self.allows(to, role) {
            Ok(to)
        } else {
            Err(self.rejected(to))
        }
    }

    /// The error for a move from `self` to `to` that cannot happen.
    fn rejected(self, to: Self) -> Error {
        Error::InvalidTransition {
            entity: Self::ENTITY,
            from: self.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

/// Writes the `Set` fields of `active` to the rows matching `guard` and returns how many
/// rows changed.
///
/// Read-modify-write operations guard on the value they read (a status or `updated_at`), so
/// a row changed by a concurrent request in between matches nothing and the caller can
/// reject the stale write.
pub(crate) async fn update_where<C, A>(db: &C, active: A, guard: Condition) -> Result<u64>
where
    C: ConnectionTrait,
    A: ActiveModelTrait,
{
    let result = <A::Entity as EntityTrait>::update_many()
        .set(active)
        .filter(guard)
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// KYC submission status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// Saved but not sent for review
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Sent for review
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Picked up by a reviewer
    #[sea_orm(string_value = "under_review")]
    UnderReview,
    /// Verified
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined; the owner may edit and resubmit
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl KycStatus {
    /// The owner may change fields and documents only in these states.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// Statuses that count as "in use" for duplicate document detection.
    pub const ACTIVE: [Self; 3] = [Self::Submitted, Self::UnderReview, Self::Approved];

    /// Statuses shown in the admin review queue.
    pub const REVIEW_QUEUE: [Self; 2] = [Self::Submitted, Self::UnderReview];
}

impl Lifecycle for KycStatus {
    const ENTITY: &'static str = "kyc";

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn allows(self, to: Self, role: Role) -> bool {
        match role {
            Role::Owner => self.is_editable() && matches!(to, Self::Draft | Self::Submitted),
            Role::Admin => matches!(
                (self, to),
                (Self::Submitted, Self::UnderReview | Self::Approved | Self::Rejected)
                    | (Self::UnderReview, Self::Approved | Self::Rejected)
                    | (Self::Approved, Self::Rejected)
            ),
        }
    }
}

/// Shipment booking status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Being prepared, not yet sent
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Waiting for a quote
    #[sea_orm(string_value = "quote_requested")]
    QuoteRequested,
    /// A quote is available
    #[sea_orm(string_value = "quote_ready")]
    QuoteReady,
    /// Paid and booked
    #[sea_orm(string_value = "booked")]
    Booked,
    /// Withdrawn
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl Lifecycle for ShipmentStatus {
    const ENTITY: &'static str = "shipment";

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::QuoteRequested => "quote_requested",
            Self::QuoteReady => "quote_ready",
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
        }
    }

    fn allows(self, to: Self, role: Role) -> bool {
        match (self, to) {
            (Self::Draft, Self::QuoteRequested) | (Self::QuoteReady, Self::Booked) => {
                role == Role::Owner
            }
            (Self::QuoteRequested | Self::QuoteReady, Self::QuoteReady) => role == Role::Admin,
            (Self::Draft | Self::QuoteRequested | Self::QuoteReady, Self::Cancelled) => true,
            _ => false,
        }
    }
}

/// Escrow payment status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds held in escrow
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Release to the counterparty scheduled
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Funds released
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Payer disputes the order
    #[sea_orm(string_value = "dispute")]
    Dispute,
    /// Funds returned to the payer
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl Lifecycle for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Dispute => "dispute",
            Self::Refunded => "refunded",
        }
    }

    fn allows(self, to: Self, role: Role) -> bool {
        match (self, to) {
            (Self::InProgress | Self::Scheduled, Self::Dispute) => role == Role::Owner,
            (Self::InProgress, Self::Scheduled)
            | (Self::InProgress | Self::Scheduled, Self::Completed)
            | (Self::Dispute, Self::Refunded | Self::InProgress) => role == Role::Admin,
            _ => false,
        }
    }
}

/// Buyer enquiry status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum EnquiryStatus {
    /// Waiting for the seller
    #[sea_orm(string_value = "open")]
    Open,
    /// Seller has answered
    #[sea_orm(string_value = "responded")]
    Responded,
    /// No further action
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl Lifecycle for EnquiryStatus {
    const ENTITY: &'static str = "enquiry";

    fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Responded => "responded",
            Self::Closed => "closed",
        }
    }

    fn allows(self, to: Self, _role: Role) -> bool {
        matches!(
            (self, to),
            (Self::Open, Self::Responded) | (Self::Open | Self::Responded, Self::Closed)
        )
    }
}

/// Container size for a shipment quote
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ContainerSize {
    /// Twenty-foot container
    #[sea_orm(string_value = "20ft")]
    #[serde(rename = "20ft")]
    Twenty,
    /// Forty-foot container
    #[sea_orm(string_value = "40ft")]
    #[serde(rename = "40ft")]
    Forty,
    /// Less than container load
    #[sea_orm(string_value = "lcl")]
    #[serde(rename = "lcl")]
    Lcl,
}

/// Customs clearance scope
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CustomsScope {
    /// Import clearance at destination
    #[sea_orm(string_value = "import")]
    Import,
    /// Export clearance at origin
    #[sea_orm(string_value = "export")]
    Export,
    /// Both ends
    #[sea_orm(string_value = "both")]
    Both,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_kyc_owner_can_only_save_or_submit_while_editable() {
        assert!(KycStatus::Draft.allows(KycStatus::Draft, Role::Owner));
        assert!(KycStatus::Draft.allows(KycStatus::Submitted, Role::Owner));
        assert!(KycStatus::Rejected.allows(KycStatus::Submitted, Role::Owner));
        assert!(KycStatus::Rejected.allows(KycStatus::Draft, Role::Owner));

        assert!(!KycStatus::Submitted.allows(KycStatus::Draft, Role::Owner));
        assert!(!KycStatus::Approved.allows(KycStatus::Submitted, Role::Owner));
        assert!(!KycStatus::Draft.allows(KycStatus::Approved, Role::Owner));
    }

    #[test]
    fn test_kyc_admin_review_moves() {
        assert!(KycStatus::Submitted.allows(KycStatus::UnderReview, Role::Admin));
        assert!(KycStatus::Submitted.allows(KycStatus::Approved, Role::Admin));
        assert!(KycStatus::UnderReview.allows(KycStatus::Rejected, Role::Admin));
        assert!(KycStatus::Approved.allows(KycStatus::Rejected, Role::Admin));

        // Admins cannot approve something that was never submitted
        assert!(!KycStatus::Draft.allows(KycStatus::Approved, Role::Admin));
        assert!(!KycStatus::Rejected.allows(KycStatus::Approved, Role::Admin));
        assert!(!KycStatus::Approved.allows(KycStatus::UnderReview, Role::Admin));
    }

    #[test]
    fn test_transition_error_names_both_states() {
        let err = KycStatus::Approved
            .transition(KycStatus::Draft, Role::Owner)
            .unwrap_err();
        match err {
            Error::InvalidTransition { entity, from, to } => {
                assert_eq!(entity, "kyc");
                assert_eq!(from, "approved");
                assert_eq!(to, "draft");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_shipment_lifecycle() {
        use ShipmentStatus::*;
        assert!(Draft.allows(QuoteRequested, Role::Owner));
        assert!(QuoteRequested.allows(QuoteReady, Role::Admin));
        assert!(!QuoteRequested.allows(QuoteReady, Role::Owner));
        assert!(QuoteReady.allows(QuoteReady, Role::Admin));
        assert!(QuoteReady.allows(Booked, Role::Owner));
        assert!(!QuoteRequested.allows(Booked, Role::Owner));
        assert!(QuoteRequested.allows(Cancelled, Role::Owner));
        assert!(QuoteReady.allows(Cancelled, Role::Admin));
        assert!(!Booked.allows(Cancelled, Role::Owner));
        assert!(!Cancelled.allows(QuoteRequested, Role::Owner));
    }

    #[test]
    fn test_payment_escrow_lifecycle() {
        use PaymentStatus::*;
        assert!(InProgress.allows(Scheduled, Role::Admin));
        assert!(Scheduled.allows(Completed, Role::Admin));
        assert!(InProgress.allows(Dispute, Role::Owner));
        assert!(!InProgress.allows(Dispute, Role::Admin));
        assert!(Dispute.allows(Refunded, Role::Admin));
        assert!(Dispute.allows(InProgress, Role::Admin));
        assert!(!Completed.allows(Dispute, Role::Owner));
        assert!(!Refunded.allows(InProgress, Role::Admin));
        assert!(!InProgress.allows(Completed, Role::Owner));
    }

    #[test]
    fn test_enquiry_lifecycle() {
        use EnquiryStatus::*;
        assert!(Open.allows(Responded, Role::Owner));
        assert!(Responded.allows(Closed, Role::Owner));
        assert!(!Closed.allows(Open, Role::Owner));
        assert!(!Responded.allows(Open, Role::Owner));
    }

    #[test]
    fn test_container_size_serde_names() {
        assert_eq!(
            serde_json::to_string(&ContainerSize::Forty).unwrap(),
            "\"40ft\""
        );
        let parsed: ContainerSize = serde_json::from_str("\"lcl\"").unwrap();
        assert_eq!(parsed, ContainerSize::Lcl);
    }
}
