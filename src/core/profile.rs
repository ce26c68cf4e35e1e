//! Profile business logic - account sign-up, lookup and admin checks.

use crate::{
    config::admins,
    entities::{Profile, profile},
    errors::{Error, Result},
};
use regex::Regex;
use sea_orm::{Set, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Sign-up form
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    /// Contact name
    pub name: String,
    /// Login email
    pub email: String,
    /// Trading name
    pub company_name: Option<String>,
    /// Country of registration
    pub country: Option<String>,
}

/// Profile fields the owner may change; `None` leaves a field untouched and an empty
/// string clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// Contact name
    pub name: Option<String>,
    /// Trading name
    pub company_name: Option<String>,
    /// Country
    pub country: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

/// Trims a string and turns empty input into `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether `email` looks like an address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

fn new_api_token() -> String {
    format!("exr_{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Creates a profile and issues its API token.
///
/// The email is stored lowercased and must be unused. Accounts whose email is listed in
/// `ADMIN_EMAILS` are created as admins.
pub async fn create_profile(db: &DatabaseConnection, new: NewProfile) -> Result<profile::Model> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }
    let email = new.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(Error::validation(format!("Invalid email address: {email}")));
    }

    let taken = Profile::find()
        .filter(profile::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(Error::validation("Email is already registered"));
    }

    let is_admin = admins::is_admin_email(&email);
    let model = profile::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name),
        email: Set(email),
        company_name: Set(non_empty(new.company_name)),
        country: Set(non_empty(new.country)),
        avatar_url: Set(None),
        is_admin: Set(is_admin),
        api_token: Set(new_api_token()),
        created_at: Set(chrono::Utc::now()),
    };

    let created = model.insert(db).await?;
    tracing::info!(profile_id = %created.id, is_admin, "Created profile");
    Ok(created)
}

/// Finds a profile by id.
pub async fn get_profile<C: ConnectionTrait>(
    db: &C,
    profile_id: &str,
) -> Result<Option<profile::Model>> {
    Profile::find_by_id(profile_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the profile owning an API token.
pub async fn get_profile_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<profile::Model>> {
    if token.is_empty() {
        return Ok(None);
    }
    Profile::find()
        .filter(profile::Column::ApiToken.eq(token))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads several profiles at once, keyed by id. Unknown ids are simply absent.
pub async fn get_profiles_by_ids(
    db: &DatabaseConnection,
    ids: &[String],
) -> Result<HashMap<String, profile::Model>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Profile::find()
        .filter(profile::Column::Id.is_in(ids.iter().cloned()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|p| (p.id.clone(), p)).collect())
}

/// Applies an owner's profile changes.
pub async fn update_profile(
    db: &DatabaseConnection,
    profile_id: &str,
    update: ProfileUpdate,
) -> Result<profile::Model> {
    let existing = get_profile(db, profile_id)
        .await?
        .ok_or_else(|| Error::not_found("profile", profile_id))?;

    let mut active: profile::ActiveModel = existing.into();
    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Name cannot be empty"));
        }
        active.name = Set(name);
    }
    if update.company_name.is_some() {
        active.company_name = Set(non_empty(update.company_name));
    }
    if update.country.is_some() {
        active.country = Set(non_empty(update.country));
    }
    if update.avatar_url.is_some() {
        active.avatar_url = Set(non_empty(update.avatar_url));
    }
    active.update(db).await.map_err(Into::into)
}

/// Whether the profile may use admin operations: the stored flag, or the designated
/// operations account (`ADMIN_USER_ID`).
#[must_use]
pub fn is_admin(profile: &profile::Model, admin_user_id: Option<&str>) -> bool {
    profile.is_admin || admin_user_id == Some(profile.id.as_str())
}

/// Name shown to counterparties: the company name, or `"User"` when unset.
#[must_use]
pub fn display_name(profile: Option<&profile::Model>) -> String {
    profile
        .and_then(|p| p.company_name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("User")
        .to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ops@exerly.in"));
        assert!(is_valid_email("  a.b+c@trade.co.uk "));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[tokio::test]
    async fn test_create_profile_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_profile(
            &db,
            NewProfile {
                name: "   ".to_string(),
                email: "x@y.io".to_string(),
                company_name: None,
                country: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_profile(
            &db,
            NewProfile {
                name: "Asha".to_string(),
                email: "not-an-email".to_string(),
                company_name: None,
                country: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_profile_normalises_and_issues_token() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_profile(
            &db,
            NewProfile {
                name: " Asha Rao ".to_string(),
                email: "Asha@Spices.IN".to_string(),
                company_name: Some("  ".to_string()),
                country: Some("India".to_string()),
            },
        )
        .await?;

        assert_eq!(created.name, "Asha Rao");
        assert_eq!(created.email, "asha@spices.in");
        assert!(created.company_name.is_none());
        assert_eq!(created.country.as_deref(), Some("India"));
        assert!(created.api_token.starts_with("exr_"));

        let by_token = get_profile_by_token(&db, &created.api_token).await?;
        assert_eq!(by_token.unwrap().id, created.id);
        assert!(get_profile_by_token(&db, "").await?.is_none());
        assert!(get_profile_by_token(&db, "exr_wrong").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "dup").await?;
        let result = create_profile(
            &db,
            NewProfile {
                name: "Other".to_string(),
                email: "DUP@example.com".to_string(),
                company_name: None,
                country: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_profile() -> Result<()> {
        let db = setup_test_db().await?;
        let p = create_test_profile(&db, "seller").await?;

        let updated = update_profile(
            &db,
            &p.id,
            ProfileUpdate {
                company_name: Some("Kerala Spice Co".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.company_name.as_deref(), Some("Kerala Spice Co"));
        assert_eq!(updated.name, p.name);

        // Empty string clears an optional field
        let cleared = update_profile(
            &db,
            &p.id,
            ProfileUpdate {
                company_name: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
        assert!(cleared.company_name.is_none());

        let missing = update_profile(&db, "nope", ProfileUpdate::default()).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_profiles_by_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_profile(&db, "a").await?;
        let b = create_test_profile(&db, "b").await?;

        let map = get_profiles_by_ids(&db, &[a.id.clone(), b.id.clone(), "ghost".to_string()])
            .await?;
        assert_eq!(map.len(), 2);
        assert!(map.contains_key(&a.id));
        assert!(get_profiles_by_ids(&db, &[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_is_admin() -> Result<()> {
        let db = setup_test_db().await?;
        let ops = create_admin_profile(&db, "ops").await?;
        let user = create_test_profile(&db, "user").await?;

        assert!(is_admin(&ops, None));
        assert!(!is_admin(&user, None));
        assert!(is_admin(&user, Some(user.id.as_str())));
        assert!(!is_admin(&user, Some(ops.id.as_str())));
        Ok(())
    }

    #[tokio::test]
    async fn test_display_name_fallback() -> Result<()> {
        let db = setup_test_db().await?;
        let p = create_test_profile(&db, "named").await?;
        assert_eq!(display_name(Some(&p)), "named Trading");
        assert_eq!(display_name(None), "User");
        Ok(())
    }
}
