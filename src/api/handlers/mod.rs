//! Route handlers grouped by area.

/// Admin review, quoting and escrow operations
pub mod admin;
/// Contact form
pub mod contact;
/// Buyer enquiries
pub mod enquiries;
/// Own KYC submission
pub mod kyc;
/// Own listings
pub mod listings;
/// Marketplace search and seller directory
pub mod marketplace;
/// Direct messages and the live feed
pub mod messages;
/// Escrow payments
pub mod payments;
/// Sign-up and own profile
pub mod profiles;
/// Shipments, customs requests and the document vault
pub mod shipments;
/// Signed and public object downloads
pub mod storage;

use serde::Deserialize;

/// `?ext=` query used by upload routes
#[derive(Debug, Deserialize)]
pub struct ExtQuery {
    /// File extension of the uploaded object
    pub ext: String,
}
