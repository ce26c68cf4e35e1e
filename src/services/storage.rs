//! Object storage on the local filesystem.
//!
//! Objects live under `{root}/{bucket}/{key}`. Keys are restricted to a conservative
//! character set and may not contain `..` segments, so a key can never escape its bucket.
//! Private objects are served through short-lived signed links: the signature is a keyed
//! BLAKE3 hash over bucket, key and expiry.

use crate::config::settings::StorageConfig;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SIGNING_CONTEXT: &str = "exerly 2025 storage signed url v1";

/// Storage buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bucket {
    /// Identity and business documents; private
    #[serde(rename = "kyc-docs")]
    KycDocs,
    /// Listing photos and videos; public
    #[serde(rename = "listings")]
    Listings,
    /// Trade document vault; private
    #[serde(rename = "documents")]
    Documents,
}

impl Bucket {
    /// Directory / wire name of the bucket
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KycDocs => "kyc-docs",
            Self::Listings => "listings",
            Self::Documents => "documents",
        }
    }

    /// Whether objects may be read without a signed link
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Listings)
    }
}

/// A signed download link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    /// Relative URL of the download route including query string
    pub url: String,
    /// Unix timestamp after which the link stops working
    pub expires: i64,
}

/// Filesystem-backed object store
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    signing_key: [u8; 32],
    ttl_secs: i64,
    public_base_url: String,
}

/// Returns the key unchanged if it is safe to use as a relative path.
fn validate_key(key: &str) -> Result<&str> {
    let ok_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    let ok_segments = key
        .split('/')
        .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if key.is_empty() || !ok_chars || !ok_segments {
        return Err(Error::Storage {
            message: format!("invalid object key: {key:?}"),
        });
    }
    Ok(key)
}

impl ObjectStore {
    /// Creates a store from configuration. The signing key is derived from the configured
    /// secret, so any secret length is accepted.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            signing_key: blake3::derive_key(SIGNING_CONTEXT, config.signing_key.as_bytes()),
            ttl_secs: config.signed_url_ttl_secs,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Filesystem path of an object.
    pub fn local_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf> {
        let key = validate_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }

    /// Writes an object, creating parent directories as needed. Existing objects are not
    /// overwritten.
    pub async fn put(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.local_path(bucket, key)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(Error::Storage {
                message: format!("object already exists: {key}"),
            });
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(bucket = bucket.as_str(), key, size = bytes.len(), "Stored object");
        Ok(())
    }

    /// Reads an object.
    pub async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>> {
        let path = self.local_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("object", key))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes objects; keys that do not exist are ignored.
    pub async fn remove(&self, bucket: Bucket, keys: &[String]) -> Result<()> {
        for key in keys {
            let path = self.local_path(bucket, key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(bucket = bucket.as_str(), key, "Removed object"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    /// Inverse of [`ObjectStore::public_url`]; `None` for URLs this store did not issue.
    #[must_use]
    pub fn key_from_public_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| validate_key(key).is_ok())
    }

    fn signature(&self, bucket: Bucket, key: &str, expires: i64) -> blake3::Hash {
        let payload = format!("{}\n{key}\n{expires}", bucket.as_str());
        blake3::keyed_hash(&self.signing_key, payload.as_bytes())
    }

    /// Issues a signed link valid for the configured TTL from `now`.
    pub fn sign(&self, bucket: Bucket, key: &str, now: DateTime<Utc>) -> Result<SignedUrl> {
        let key = validate_key(key)?;
        let expires = now.timestamp() + self.ttl_secs;
        let sig = self.signature(bucket, key, expires).to_hex();
        Ok(SignedUrl {
            url: format!(
                "/v1/storage/object?bucket={}&path={key}&expires={expires}&sig={sig}",
                bucket.as_str()
            ),
            expires,
        })
    }

    /// Checks a signed link's signature and expiry.
    pub fn verify(
        &self,
        bucket: Bucket,
        key: &str,
        expires: i64,
        sig: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key = validate_key(key)?;
        if now.timestamp() > expires {
            return Err(Error::forbidden("signed URL has expired"));
        }
        let provided = blake3::Hash::from_hex(sig)
            .map_err(|_| Error::forbidden("malformed signature"))?;
        // `blake3::Hash` equality is constant-time
        if provided != self.signature(bucket, key, expires) {
            return Err(Error::forbidden("invalid signature"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::Duration;

    fn store(dir: &std::path::Path) -> ObjectStore {
        ObjectStore::new(&StorageConfig {
            root: dir.to_path_buf(),
            signing_key: "test-secret".to_string(),
            signed_url_ttl_secs: 60,
            public_base_url: "/v1/storage/public/".to_string(),
        })
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("user/kyc/pan-1.jpg").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("user/../../x").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("user//x").is_err());
        assert!(validate_key("user/x y.jpg").is_err());
        assert!(validate_key("").is_err());
    }

    #[tokio::test]
    async fn test_put_get_remove() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(dir.path());

        store.put(Bucket::KycDocs, "u1/kyc/pan-1.txt", b"hello").await?;
        assert_eq!(store.get(Bucket::KycDocs, "u1/kyc/pan-1.txt").await?, b"hello");

        // Same key in another bucket is a different object
        assert!(matches!(
            store.get(Bucket::Listings, "u1/kyc/pan-1.txt").await,
            Err(Error::NotFound { .. })
        ));

        // No silent overwrite
        assert!(matches!(
            store.put(Bucket::KycDocs, "u1/kyc/pan-1.txt", b"again").await,
            Err(Error::Storage { .. })
        ));

        store
            .remove(
                Bucket::KycDocs,
                &["u1/kyc/pan-1.txt".to_string(), "u1/kyc/missing.txt".to_string()],
            )
            .await?;
        assert!(store.get(Bucket::KycDocs, "u1/kyc/pan-1.txt").await.is_err());
        Ok(())
    }

    #[test]
    fn test_sign_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let now = Utc::now();

        let signed = store.sign(Bucket::KycDocs, "u1/kyc/pan-1.jpg", now).unwrap();
        assert_eq!(signed.expires, now.timestamp() + 60);
        let sig = signed.url.rsplit("sig=").next().unwrap();

        assert!(
            store
                .verify(Bucket::KycDocs, "u1/kyc/pan-1.jpg", signed.expires, sig, now)
                .is_ok()
        );
        // Different key, bucket, or expiry invalidates the signature
        assert!(
            store
                .verify(Bucket::KycDocs, "u2/kyc/pan-1.jpg", signed.expires, sig, now)
                .is_err()
        );
        assert!(
            store
                .verify(Bucket::Documents, "u1/kyc/pan-1.jpg", signed.expires, sig, now)
                .is_err()
        );
        assert!(
            store
                .verify(Bucket::KycDocs, "u1/kyc/pan-1.jpg", signed.expires + 1, sig, now)
                .is_err()
        );
        // Expired
        let later = now + Duration::seconds(61);
        assert!(matches!(
            store.verify(Bucket::KycDocs, "u1/kyc/pan-1.jpg", signed.expires, sig, later),
            Err(Error::Forbidden { .. })
        ));
        // Garbage signature
        assert!(
            store
                .verify(Bucket::KycDocs, "u1/kyc/pan-1.jpg", signed.expires, "zz", now)
                .is_err()
        );
    }

    #[test]
    fn test_public_url_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let url = store.public_url("u1/photos/1-abc.jpg");
        assert_eq!(url, "/v1/storage/public/u1/photos/1-abc.jpg");
        assert_eq!(store.key_from_public_url(&url), Some("u1/photos/1-abc.jpg"));
        assert_eq!(store.key_from_public_url("https://elsewhere/x.jpg"), None);
    }
}
