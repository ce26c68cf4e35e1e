//! Escrow payment business logic.
//!
//! Paying for a quoted shipment holds the quote total in escrow (`in_progress`) and books
//! the shipment. From there an admin schedules or performs the release, the payer may open
//! a dispute, and an admin settles disputes by refunding or resuming the escrow.

use crate::{
    core::{
        kyc, quote, shipment as shipments,
        status::{Lifecycle, PaymentStatus, Role, ShipmentStatus, update_where},
    },
    entities::{Payment, payment, shipment},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Pays the latest quote of a shipment into escrow and books the shipment.
///
/// Requires approved KYC, a shipment in `quote_ready` owned by the payer, and an unexpired
/// quote. The payment row and the shipment status change are committed together.
#[tracing::instrument(skip(db))]
pub async fn pay_and_book(
    db: &DatabaseConnection,
    user_id: &str,
    shipment_id: &str,
    now: DateTime<Utc>,
) -> Result<payment::Model> {
    kyc::require_approved(db, user_id).await?;

    let txn = db.begin().await?;

    let shipment = shipments::get_for_viewer(&txn, user_id, false, shipment_id).await?;
    let next = shipment
        .status
        .transition(ShipmentStatus::Booked, Role::Owner)?;

    let quote = quote::latest_quote(&txn, shipment_id)
        .await?
        .ok_or_else(|| Error::validation("Shipment has no quote yet"))?;
    if quote.valid_until < now {
        return Err(Error::validation(
            "Quote has expired; request a new quote",
        ));
    }

    let payment = payment::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        order_id: Set(shipment.id.clone()),
        amount: Set(quote.total),
        currency: Set(quote.currency.clone()),
        status: Set(PaymentStatus::InProgress),
        release_at: Set(None),
        dispute_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut active: shipment::ActiveModel = shipment.into();
    active.status = Set(next);
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        shipment_id,
        amount = payment.amount,
        "Payment held in escrow; shipment booked"
    );
    Ok(payment)
}

/// Payments made by a user, newest first.
pub async fn list_for_user(db: &DatabaseConnection, user_id: &str) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::UserId.eq(user_id))
        .order_by_desc(payment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Payments grouped by escrow state
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentSummary {
    /// Funds held
    pub active: Vec<payment::Model>,
    /// Release scheduled
    pub scheduled: Vec<payment::Model>,
    /// Released
    pub completed: Vec<payment::Model>,
    /// Under dispute
    pub disputes: Vec<payment::Model>,
    /// Returned to the payer
    pub refunds: Vec<payment::Model>,
    /// Amount currently held (active, scheduled and disputed)
    pub total_held: f64,
    /// Amount released
    pub total_released: f64,
}

/// Groups payments by status and totals the held and released amounts.
#[must_use]
pub fn summarize(payments: Vec<payment::Model>) -> PaymentSummary {
    let mut summary = PaymentSummary::default();
    for p in payments {
        match p.status {
            PaymentStatus::InProgress => {
                summary.total_held += p.amount;
                summary.active.push(p);
            }
            PaymentStatus::Scheduled => {
                summary.total_held += p.amount;
                summary.scheduled.push(p);
            }
            PaymentStatus::Dispute => {
                summary.total_held += p.amount;
                summary.disputes.push(p);
            }
            PaymentStatus::Completed => {
                summary.total_released += p.amount;
                summary.completed.push(p);
            }
            PaymentStatus::Refunded => summary.refunds.push(p),
        }
    }
    summary
}

async fn apply_transition(
    db: &DatabaseConnection,
    payment_id: &str,
    to: PaymentStatus,
    role: Role,
    payer_id: Option<&str>,
    mutate: impl FnOnce(&mut payment::ActiveModel),
) -> Result<payment::Model> {
    let existing = Payment::find_by_id(payment_id.to_string())
        .one(db)
        .await?
        .filter(|p| payer_id.is_none_or(|id| p.user_id == id))
        .ok_or_else(|| Error::not_found("payment", payment_id))?;
    commit_transition(db, existing, to, role, mutate).await
}

/// Writes a status change computed from `existing`, provided the stored row still has
/// the status that was read.
async fn commit_transition(
    db: &DatabaseConnection,
    existing: payment::Model,
    to: PaymentStatus,
    role: Role,
    mutate: impl FnOnce(&mut payment::ActiveModel),
) -> Result<payment::Model> {
    let from = existing.status;
    let next = from.transition(to, role)?;
    let payment_id = existing.id.clone();

    let mut active: payment::ActiveModel = existing.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now());
    mutate(&mut active);

    let guard = Condition::all()
        .add(payment::Column::Id.eq(payment_id.as_str()))
        .add(payment::Column::Status.eq(from));
    if update_where(db, active, guard).await? == 0 {
        tracing::warn!(%payment_id, from = from.as_str(), "Payment changed concurrently");
        return Err(from.rejected(next));
    }
    let updated = Payment::find_by_id(payment_id.clone())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("payment", payment_id.as_str()))?;

    tracing::info!(%payment_id, status = next.as_str(), "Payment status changed");
    Ok(updated)
}

/// Payer disputes a held payment.
pub async fn open_dispute(
    db: &DatabaseConnection,
    user_id: &str,
    payment_id: &str,
    reason: &str,
) -> Result<payment::Model> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::validation("Dispute reason cannot be empty"));
    }
    let reason = reason.to_string();
    apply_transition(
        db,
        payment_id,
        PaymentStatus::Dispute,
        Role::Owner,
        Some(user_id),
        |active| active.dispute_reason = Set(Some(reason)),
    )
    .await
}

/// Admin schedules the release of held funds.
pub async fn schedule_release(
    db: &DatabaseConnection,
    payment_id: &str,
    release_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<payment::Model> {
    if release_at <= now {
        return Err(Error::validation("Release date must be in the future"));
    }
    apply_transition(
        db,
        payment_id,
        PaymentStatus::Scheduled,
        Role::Admin,
        None,
        |active| active.release_at = Set(Some(release_at)),
    )
    .await
}

/// Admin releases held funds to the counterparty.
pub async fn release(db: &DatabaseConnection, payment_id: &str) -> Result<payment::Model> {
    apply_transition(
        db,
        payment_id,
        PaymentStatus::Completed,
        Role::Admin,
        None,
        |_| {},
    )
    .await
}

/// Admin settles a dispute in the payer's favour.
pub async fn refund(db: &DatabaseConnection, payment_id: &str) -> Result<payment::Model> {
    apply_transition(
        db,
        payment_id,
        PaymentStatus::Refunded,
        Role::Admin,
        None,
        |_| {},
    )
    .await
}

/// Admin settles a dispute by returning the payment to escrow.
pub async fn resolve_dispute(db: &DatabaseConnection, payment_id: &str) -> Result<payment::Model> {
    apply_transition(
        db,
        payment_id,
        PaymentStatus::InProgress,
        Role::Admin,
        None,
        |active| {
            active.dispute_reason = Set(None);
            active.release_at = Set(None);
        },
    )
    .await
}
