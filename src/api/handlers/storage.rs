use crate::{
    api::{AppState, auth::AuthUser},
    errors::{Error, Result},
    services::Bucket,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

/// `?path=&bucket=`
#[derive(Debug, Deserialize)]
pub struct SignQuery {
    /// Object key
    pub path: String,
    /// Bucket; defaults to `kyc-docs`
    pub bucket: Option<Bucket>,
}

/// Whether `user_id` may obtain a link for `path`: owners only, except admins.
#[must_use]
pub fn may_sign(user_id: &str, is_admin: bool, path: &str) -> bool {
    is_admin
        || path
            .strip_prefix(user_id)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// `GET /v1/storage/signed?path`: redirects to a short-lived download link
pub async fn signed(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SignQuery>,
) -> Result<Redirect> {
    if !may_sign(user.id(), user.is_admin, &query.path) {
        return Err(Error::forbidden("You may only access your own files"));
    }
    let bucket = query.bucket.unwrap_or(Bucket::KycDocs);
    let link = state.store.sign(bucket, &query.path, chrono::Utc::now())?;
    Ok(Redirect::temporary(&link.url))
}

/// Signed link parameters
#[derive(Debug, Deserialize)]
pub struct ObjectQuery {
    /// Bucket
    pub bucket: Bucket,
    /// Object key
    pub path: String,
    /// Expiry as a Unix timestamp
    pub expires: i64,
    /// Hex signature
    pub sig: String,
}

fn content_type(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn object_response(key: &str, bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type(key))], Bytes::from(bytes)).into_response()
}

/// `GET /v1/storage/object`: serves an object named by a valid signed link
pub async fn object(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> Result<Response> {
    state.store.verify(
        query.bucket,
        &query.path,
        query.expires,
        &query.sig,
        chrono::Utc::now(),
    )?;
    let bytes = state.store.get(query.bucket, &query.path).await?;
    Ok(object_response(&query.path, bytes))
}

/// `GET /v1/storage/public/{*key}`: listing media
pub async fn public_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let bytes = state.store.get(Bucket::Listings, &key).await?;
    Ok(object_response(&key, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_sign() {
        assert!(may_sign("u1", false, "u1/kyc/pan-1.png"));
        assert!(!may_sign("u1", false, "u10/kyc/pan-1.png"));
        assert!(!may_sign("u1", false, "u2/kyc/pan-1.png"));
        assert!(may_sign("admin", true, "u2/kyc/pan-1.png"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a/b/photo.JPG"), "image/jpeg");
        assert_eq!(content_type("a/b/doc.pdf"), "application/pdf");
        assert_eq!(content_type("a/b/blob"), "application/octet-stream");
    }
}
