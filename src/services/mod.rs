//! Infrastructure services - object storage, outbound email, and document text extraction.
//!
//! Each service sits behind a small interface so the core logic can be exercised in tests
//! with local or recording implementations.

/// Notification email delivery
pub mod email;
/// Document text extraction (OCR)
pub mod ocr;
/// Bucketed object storage with signed download links
pub mod storage;

pub use email::{EmailMessage, LogMailer, Mailer, ResendMailer};
pub use ocr::{PlainTextExtractor, TesseractExtractor, TextExtractor};
pub use storage::{Bucket, ObjectStore, SignedUrl};
