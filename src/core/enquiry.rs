//! Buyer enquiries on marketplace listings.
//!
//! Creating an enquiry fans out: the enquiry row is the record of truth, and the seller and
//! the operations account are notified through ordinary messages. Those notifications are
//! best-effort; a failure is logged and the enquiry still stands.

use crate::{
    core::{
        listing::INCOTERMS,
        messaging::{self, FeedEvent, MessageFeed, NewMessage},
        status::{EnquiryStatus, Lifecycle, Role, update_where},
    },
    entities::{Enquiry, Listing, enquiry, message},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Enquiry form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnquiryRequest {
    /// Listing being enquired about
    pub listing_id: String,
    /// Free-text enquiry
    pub message: String,
    /// Quantity wanted
    pub quantity: Option<String>,
    /// Port of discharge
    pub destination_port: Option<String>,
    /// Packaging preference
    pub packaging: Option<String>,
    /// Incoterm
    pub delivery_terms: Option<String>,
    /// Payment terms
    pub payment_terms: Option<String>,
    /// Target unit price
    pub target_price: Option<f64>,
}

/// Result of an enquiry fan-out
#[derive(Debug, Clone, Serialize)]
pub struct EnquiryFanOut {
    /// The stored enquiry
    pub enquiry: enquiry::Model,
    /// Notification delivered to the seller, if it could be sent
    pub seller_message: Option<message::Model>,
    /// Copy delivered to the operations account, if configured and sent
    pub admin_copy: Option<message::Model>,
}

async fn notify(
    db: &DatabaseConnection,
    feed: &MessageFeed,
    new: NewMessage,
) -> Option<message::Model> {
    match messaging::insert_message(db, new).await {
        Ok(sent) => {
            feed.publish(FeedEvent::Insert(sent.clone()));
            Some(sent)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to deliver enquiry notification");
            None
        }
    }
}

/// Records an enquiry and notifies the seller, copying `admin_user_id` when set.
#[tracing::instrument(skip(db, feed, request))]
pub async fn create_enquiry(
    db: &DatabaseConnection,
    feed: &MessageFeed,
    buyer_id: &str,
    admin_user_id: Option<&str>,
    request: EnquiryRequest,
) -> Result<EnquiryFanOut> {
    let text = request.message.trim().to_string();
    if text.is_empty() {
        return Err(Error::validation("Enquiry message cannot be empty"));
    }
    let delivery_terms = crate::core::profile::non_empty(request.delivery_terms)
        .map(|t| t.to_uppercase());
    if let Some(terms) = delivery_terms.as_deref()
        && !INCOTERMS.contains(&terms)
    {
        return Err(Error::validation(format!("Unknown Incoterm: {terms}")));
    }
    if request
        .target_price
        .is_some_and(|p| !p.is_finite() || p < 0.0)
    {
        return Err(Error::validation("Target price must be a non-negative number"));
    }

    let listing = Listing::find_by_id(request.listing_id.clone())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("listing", request.listing_id.as_str()))?;
    if listing.user_id == buyer_id {
        return Err(Error::validation("You cannot enquire on your own listing"));
    }

    let enquiry = enquiry::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        listing_id: Set(listing.id.clone()),
        buyer_id: Set(buyer_id.to_string()),
        seller_id: Set(listing.user_id.clone()),
        message: Set(text.clone()),
        quantity: Set(crate::core::profile::non_empty(request.quantity)),
        destination_port: Set(crate::core::profile::non_empty(request.destination_port)),
        packaging: Set(crate::core::profile::non_empty(request.packaging)),
        delivery_terms: Set(delivery_terms),
        payment_terms: Set(crate::core::profile::non_empty(request.payment_terms)),
        target_price: Set(request.target_price),
        status: Set(EnquiryStatus::Open),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await?;
    tracing::info!(enquiry_id = %enquiry.id, listing_id = %listing.id, "Enquiry created");

    let seller_message = notify(
        db,
        feed,
        NewMessage {
            sender_id: buyer_id.to_string(),
            receiver_id: listing.user_id.clone(),
            content: text.clone(),
            is_enquiry: true,
            enquiry_id: Some(enquiry.id.clone()),
            is_admin_copy: false,
        },
    )
    .await;

    let admin_copy = match admin_user_id {
        Some(admin_id) => {
            notify(
                db,
                feed,
                NewMessage {
                    sender_id: buyer_id.to_string(),
                    receiver_id: admin_id.to_string(),
                    content: format!("[CC] {text}"),
                    is_enquiry: true,
                    enquiry_id: Some(enquiry.id.clone()),
                    is_admin_copy: true,
                },
            )
            .await
        }
        None => None,
    };

    Ok(EnquiryFanOut {
        enquiry,
        seller_message,
        admin_copy,
    })
}

/// Enquiries received by a seller, newest first.
pub async fn list_received(db: &DatabaseConnection, seller_id: &str) -> Result<Vec<enquiry::Model>> {
    Enquiry::find()
        .filter(enquiry::Column::SellerId.eq(seller_id))
        .order_by_desc(enquiry::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Enquiries sent by a buyer, newest first.
pub async fn list_sent(db: &DatabaseConnection, buyer_id: &str) -> Result<Vec<enquiry::Model>> {
    Enquiry::find()
        .filter(enquiry::Column::BuyerId.eq(buyer_id))
        .order_by_desc(enquiry::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Seller moves an enquiry along its lifecycle.
pub async fn update_status(
    db: &DatabaseConnection,
    seller_id: &str,
    enquiry_id: &str,
    status: EnquiryStatus,
) -> Result<enquiry::Model> {
    let existing = Enquiry::find_by_id(enquiry_id.to_string())
        .one(db)
        .await?
        .filter(|e| e.seller_id == seller_id)
        .ok_or_else(|| Error::not_found("enquiry", enquiry_id))?;
    let from = existing.status;
    let next = from.transition(status, Role::Owner)?;

    let mut active: enquiry::ActiveModel = existing.clone().into();
    active.status = Set(next);
    let guard = Condition::all()
        .add(enquiry::Column::Id.eq(enquiry_id))
        .add(enquiry::Column::Status.eq(from));
    if update_where(db, active, guard).await? == 0 {
        return Err(from.rejected(next));
    }
    Ok(enquiry::Model {
        status: next,
        ..existing
    })
}
