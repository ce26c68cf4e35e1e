//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the marketplace tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod customs_request;
pub mod document;
pub mod enquiry;
pub mod kyc_log;
pub mod kyc_submission;
pub mod lead;
pub mod listing;
pub mod message;
pub mod payment;
pub mod profile;
pub mod shipment;
pub mod shipment_quote;

// Re-export specific types to avoid conflicts
pub use customs_request::{Entity as CustomsRequest, Model as CustomsRequestModel};
pub use document::{Entity as Document, Model as DocumentModel};
pub use enquiry::{Entity as Enquiry, Model as EnquiryModel};
pub use kyc_log::{Entity as KycLog, Model as KycLogModel};
pub use kyc_submission::{Entity as KycSubmission, Model as KycSubmissionModel};
pub use lead::{Entity as Lead, Model as LeadModel};
pub use listing::{Entity as Listing, Model as ListingModel};
pub use message::{Entity as Message, Model as MessageModel};
pub use payment::{Entity as Payment, Model as PaymentModel};
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use shipment::{Entity as Shipment, Model as ShipmentModel};
pub use shipment_quote::{Entity as ShipmentQuote, Model as ShipmentQuoteModel};
