//! Quote business logic - Prices a shipment request and stores the resulting quote.
//!
//! Pricing is a flat rate card ([`QuoteRates`]): a base freight per container size plus
//! optional insurance, trucking, warehousing and customs charges. Generating a quote is an
//! admin action that also moves the shipment to `quote_ready`.

use crate::{
    config::settings::QuoteRates,
    core::status::{ContainerSize, CustomsScope, Lifecycle, Role, ShipmentStatus},
    entities::{Shipment, ShipmentQuote, shipment, shipment_quote},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Itemised price of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteBreakdown {
    /// Base ocean freight
    pub freight: f64,
    /// Cargo insurance
    pub insurance: f64,
    /// Inland trucking
    pub trucking: f64,
    /// Warehousing
    pub warehousing: f64,
    /// Customs clearance
    pub customs: f64,
}

impl QuoteBreakdown {
    /// Sum of all line items.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.freight + self.insurance + self.trucking + self.warehousing + self.customs
    }
}

/// Prices a shipment from the rate card.
///
/// Insurance is a percentage of base freight; customs costs more when both ends are cleared.
#[must_use]
pub fn compute_quote(
    rates: &QuoteRates,
    container: ContainerSize,
    insurance: bool,
    trucking: bool,
    warehousing: bool,
    customs: CustomsScope,
) -> QuoteBreakdown {
    let freight = match container {
        ContainerSize::Forty => rates.freight_40ft,
        ContainerSize::Twenty => rates.freight_20ft,
        ContainerSize::Lcl => rates.freight_lcl,
    };
    let charge = |enabled: bool, amount: f64| if enabled { amount } else { 0.0 };

    QuoteBreakdown {
        freight,
        insurance: charge(insurance, freight * rates.insurance_rate),
        trucking: charge(trucking, rates.trucking),
        warehousing: charge(warehousing, rates.warehousing),
        customs: match customs {
            CustomsScope::Both => rates.customs_both,
            CustomsScope::Import | CustomsScope::Export => rates.customs_single,
        },
    }
}

/// Prices an existing shipment request.
#[must_use]
pub fn breakdown_for(rates: &QuoteRates, shipment: &shipment::Model) -> QuoteBreakdown {
    compute_quote(
        rates,
        shipment.container_size,
        shipment.insurance,
        shipment.trucking,
        shipment.warehousing,
        shipment.customs_scope,
    )
}

/// Generates (or regenerates) the quote for a shipment and marks it `quote_ready`.
///
/// The quote is valid for `rates.validity_days` from `now`. Fails with
/// [`Error::InvalidTransition`] for shipments that are drafts, booked, or cancelled.
#[tracing::instrument(skip(db, rates))]
pub async fn generate_quote(
    db: &DatabaseConnection,
    rates: &QuoteRates,
    shipment_id: &str,
    now: DateTime<Utc>,
) -> Result<shipment_quote::Model> {
    let txn = db.begin().await?;

    let shipment = Shipment::find_by_id(shipment_id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("shipment", shipment_id))?;
    let next = shipment
        .status
        .transition(ShipmentStatus::QuoteReady, Role::Admin)?;

    let breakdown = breakdown_for(rates, &shipment);
    let quote = shipment_quote::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        shipment_id: Set(shipment.id.clone()),
        currency: Set(rates.currency.clone()),
        total: Set(breakdown.total()),
        freight: Set(breakdown.freight),
        insurance: Set(breakdown.insurance),
        trucking: Set(breakdown.trucking),
        warehousing: Set(breakdown.warehousing),
        customs: Set(breakdown.customs),
        valid_until: Set(now + chrono::Duration::days(rates.validity_days)),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut active: shipment::ActiveModel = shipment.into();
    active.status = Set(next);
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(shipment_id, total = quote.total, "Generated shipment quote");
    Ok(quote)
}

/// Most recent quote for a shipment.
pub async fn latest_quote<C: ConnectionTrait>(
    db: &C,
    shipment_id: &str,
) -> Result<Option<shipment_quote::Model>> {
    ShipmentQuote::find()
        .filter(shipment_quote::Column::ShipmentId.eq(shipment_id))
        .order_by_desc(shipment_quote::Column::CreatedAt)
        .one(db)
        .await
        .map_err(Into::into)
}
