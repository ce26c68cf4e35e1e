//! Unified error type for the marketplace backend.
//!
//! Every layer (core logic, services, HTTP handlers) returns [`Result`]. The HTTP layer maps
//! each variant onto a status code in [`crate::api::error`].

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database driver or query error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP request failure
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Input rejected by validation
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Requested row does not exist (or is not visible to the caller)
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"listing"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A status change that the entity lifecycle does not allow
    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidTransition {
        /// Entity kind, e.g. `"shipment"`
        entity: &'static str,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The record changed while the request was working on it
    #[error("{entity} {id} was modified concurrently; reload and retry")]
    Conflict {
        /// Entity kind, e.g. `"listing"`
        entity: &'static str,
        /// Identifier of the record
        id: String,
    },

    /// No or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed to perform the operation
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why access was denied
        message: String,
    },

    /// Operation requires an approved KYC submission
    #[error("KYC approval required")]
    KycRequired,

    /// A per-user or per-listing quota was hit
    #[error("Limit exceeded: {message}")]
    LimitExceeded {
        /// Which limit
        message: String,
    },

    /// Object storage failure or rejected path
    #[error("Storage error: {message}")]
    Storage {
        /// What went wrong
        message: String,
    },

    /// Notification email could not be sent
    #[error("Email error: {message}")]
    Email {
        /// What went wrong
        message: String,
    },

    /// Text extraction failed
    #[error("OCR error: {message}")]
    Ocr {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
