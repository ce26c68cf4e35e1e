//! Admin bootstrap configuration loaded from environment variables.
//!
//! `ADMIN_EMAILS` lists the email addresses whose profiles are created with the admin flag
//! set. `ADMIN_USER_ID` names the account that receives CC copies of enquiries.

/// Parses a comma-separated email list: entries are trimmed and lowercased, empty entries
/// are dropped.
#[must_use]
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Gets the configured admin emails from `ADMIN_EMAILS`.
///
/// # Returns
///
/// An empty list when the variable is unset.
#[must_use]
pub fn get_admin_emails() -> Vec<String> {
    std::env::var("ADMIN_EMAILS")
        .map(|raw| parse_admin_emails(&raw))
        .unwrap_or_default()
}

/// Whether `email` is listed in `ADMIN_EMAILS` (case-insensitive).
#[must_use]
pub fn is_admin_email(email: &str) -> bool {
    let needle = email.trim().to_lowercase();
    get_admin_emails().iter().any(|e| *e == needle)
}

/// Gets the admin account id that receives enquiry copies, if configured.
#[must_use]
pub fn get_admin_user_id() -> Option<String> {
    std::env::var("ADMIN_USER_ID")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
