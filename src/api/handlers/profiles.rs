use crate::{
    api::{AppState, auth::AuthUser},
    core::profile::{self, NewProfile, ProfileUpdate},
    entities::ProfileModel,
    errors::Result,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Sign-up response; the only time the API token is returned
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    /// The new profile
    pub profile: ProfileModel,
    /// Bearer token for subsequent requests
    pub api_token: String,
}

/// Caller's own profile
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Profile fields
    #[serde(flatten)]
    pub profile: ProfileModel,
    /// Effective admin rights
    pub is_admin: bool,
}

/// `POST /v1/profiles`
pub async fn sign_up(
    State(state): State<AppState>,
    Json(new): Json<NewProfile>,
) -> Result<(StatusCode, Json<SignUpResponse>)> {
    let created = profile::create_profile(&state.db, new).await?;
    let api_token = created.api_token.clone();
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            profile: created,
            api_token,
        }),
    ))
}

/// `GET /v1/profiles/me`
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        is_admin: user.is_admin,
        profile: user.profile,
    })
}

/// `PATCH /v1/profiles/me`
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<MeResponse>> {
    let updated = profile::update_profile(&state.db, user.id(), update).await?;
    Ok(Json(MeResponse {
        is_admin: user.is_admin,
        profile: updated,
    }))
}
