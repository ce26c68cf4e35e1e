//! Bearer-token authentication extractors.
//!
//! Clients send `Authorization: Bearer <api_token>`. [`AuthUser`] resolves the token to a
//! profile; [`AdminUser`] additionally requires admin rights.

use super::AppState;
use crate::{
    core::profile,
    entities::ProfileModel,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

/// Extracts the bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// An authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The caller's profile
    pub profile: ProfileModel,
    /// Whether the caller may use admin operations
    pub is_admin: bool,
}

impl AuthUser {
    /// The caller's profile id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(&parts.headers).ok_or(Error::Unauthorized)?;
        let found = profile::get_profile_by_token(&state.db, token)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Rejected request with unknown API token");
                Error::Unauthorized
            })?;
        let is_admin = profile::is_admin(&found, state.admin_user_id.as_deref());
        Ok(Self {
            profile: found,
            is_admin,
        })
    }
}

/// An authenticated caller with admin rights
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(Error::forbidden("Admin access required"));
        }
        Ok(Self(user))
    }
}
