//! Core business logic - framework-agnostic marketplace, compliance, logistics and escrow
//! operations.
//!
//! Every function takes a database connection (and whatever services it needs) explicitly,
//! so the same logic backs the HTTP API and the tests.

/// Buyer enquiries and their fan-out notifications
pub mod enquiry;
/// KYC submissions, document checks and admin review
pub mod kyc;
/// Seller listings, media and marketplace search
pub mod listing;
/// Direct messages and the live change feed
pub mod messaging;
/// Contact form leads
pub mod contact;
/// Escrow payments
pub mod payment;
/// Accounts and API tokens
pub mod profile;
/// Shipment pricing
pub mod quote;
/// Shipment requests, customs assistance and the document vault
pub mod shipment;
/// Status enums and their lifecycles
pub mod status;
