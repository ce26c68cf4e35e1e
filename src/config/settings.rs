//! Application settings loading from config.toml
//!
//! Every section of the file is optional; a missing file yields the defaults below. A few
//! values can be overridden from the environment (usually via `.env`) so secrets do not
//! have to live in the TOML file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Object storage settings
    pub storage: StorageConfig,
    /// Notification email settings
    pub email: EmailConfig,
    /// Document text extraction settings
    pub ocr: OcrConfig,
    /// Freight quote rates
    pub quote: QuoteRates,
    /// Marketplace quotas
    pub marketplace: MarketplaceConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`
    pub bind_addr: String,
    /// Origins allowed by CORS; empty allows any origin
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body (file uploads) in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            allowed_origins: Vec::new(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Object storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per bucket
    pub root: PathBuf,
    /// Secret used to sign download links
    pub signing_key: String,
    /// Lifetime of signed links in seconds
    pub signed_url_ttl_secs: i64,
    /// Public base URL prepended to listing media paths
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/storage"),
            signing_key: "change-me".to_string(),
            signed_url_ttl_secs: 60,
            public_base_url: "/v1/storage/public".to_string(),
        }
    }
}

/// Notification email settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Email API key; when absent emails are only logged
    pub api_key: Option<String>,
    /// Email API endpoint
    pub endpoint: String,
    /// Sender address
    pub from: String,
    /// Team inbox that receives KYC decisions
    pub team: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.resend.com/emails".to_string(),
            from: "no-reply@exerly.in".to_string(),
            team: vec!["team@exerly.in".to_string()],
        }
    }
}

/// Document text extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run the `tesseract` binary; when false documents are read as plain text
    pub enabled: bool,
    /// Path or name of the tesseract binary
    pub tesseract_bin: String,
    /// Language pack passed to tesseract
    pub language: String,
    /// Seconds a single tesseract run may take before it is killed
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tesseract_bin: "tesseract".to_string(),
            language: "eng".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Freight quote rates in the quote currency
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteRates {
    /// ISO currency code of every amount below
    pub currency: String,
    /// Base freight for a 40ft container
    pub freight_40ft: f64,
    /// Base freight for a 20ft container
    pub freight_20ft: f64,
    /// Base freight for less-than-container load
    pub freight_lcl: f64,
    /// Insurance as a fraction of base freight
    pub insurance_rate: f64,
    /// Flat trucking fee
    pub trucking: f64,
    /// Flat warehousing fee
    pub warehousing: f64,
    /// Customs fee when clearing both ends
    pub customs_both: f64,
    /// Customs fee when clearing one end
    pub customs_single: f64,
    /// Days a quote stays valid
    pub validity_days: i64,
}

impl Default for QuoteRates {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            freight_40ft: 2000.0,
            freight_20ft: 1600.0,
            freight_lcl: 800.0,
            insurance_rate: 0.05,
            trucking: 150.0,
            warehousing: 100.0,
            customs_both: 250.0,
            customs_single: 150.0,
            validity_days: 7,
        }
    }
}

/// Marketplace quotas
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Listings a seller may hold
    pub max_listings_per_seller: u64,
    /// Photos per listing
    pub max_photos: usize,
    /// Videos per listing
    pub max_videos: usize,
    /// Default number of search results
    pub search_limit: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            max_listings_per_seller: 50,
            max_photos: 5,
            max_videos: 2,
            search_limit: 48,
        }
    }
}

/// Loads the configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Applies environment overrides on top of a loaded configuration.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(addr) = std::env::var("BIND_ADDR") {
        config.server.bind_addr = addr;
    }
    if let Ok(key) = std::env::var("RESEND_API_KEY") {
        config.email.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("STORAGE_SIGNING_KEY") {
        config.storage.signing_key = key;
    }
}

/// Loads the main application configuration.
///
/// Reads the file named by `CONFIG_PATH` (default `config.toml`). A missing file is not an
/// error: the defaults are used. Environment overrides are applied last.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = if Path::new(&path).exists() {
        load_config(&path)
            .inspect_err(|e| tracing::error!("Critical error loading configuration: {}", e))?
    } else {
        tracing::warn!("{} not found, using default configuration", path);
        AppConfig::default()
    };
    apply_env_overrides(&mut config);
    check_signing_key(&config.storage)
        .inspect_err(|e| tracing::error!("Refusing to start: {}", e))?;
    Ok(config)
}

/// Rejects a blank or built-in storage signing key.
///
/// # Errors
/// Returns [`Error::Config`] when the key is empty or still the placeholder default.
pub fn check_signing_key(storage: &StorageConfig) -> Result<()> {
    let key = storage.signing_key.trim();
    if key.is_empty() || key == StorageConfig::default().signing_key {
        return Err(Error::Config {
            message: "storage.signing_key must be set to a secret value (STORAGE_SIGNING_KEY)"
                .to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [server]
            bind_addr = "0.0.0.0:9000"

            [quote]
            freight_40ft = 2500.0
            validity_days = 3

            [marketplace]
            max_listings_per_seller = 10
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.quote.freight_40ft, 2500.0);
        assert_eq!(config.quote.validity_days, 3);
        // Unspecified keys keep their defaults
        assert_eq!(config.quote.freight_20ft, 1600.0);
        assert_eq!(config.quote.currency, "USD");
        assert_eq!(config.marketplace.max_listings_per_seller, 10);
        assert_eq!(config.marketplace.max_photos, 5);
        assert_eq!(config.storage.signed_url_ttl_secs, 60);
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert!(!config.ocr.enabled);
        assert!(config.email.api_key.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nbind_addr = 1").unwrap();
        let result = load_config(&path);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_default_or_blank_signing_key_is_rejected() {
        let defaults = StorageConfig::default();
        assert!(matches!(
            check_signing_key(&defaults),
            Err(Error::Config { .. })
        ));

        let blank = StorageConfig {
            signing_key: "   ".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(check_signing_key(&blank), Err(Error::Config { .. })));

        let set = StorageConfig {
            signing_key: "s3cr3t-value-from-the-vault".to_string(),
            ..StorageConfig::default()
        };
        assert!(check_signing_key(&set).is_ok());
    }

    #[test]
    fn test_ocr_timeout_defaults_and_parses() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.ocr.timeout_secs, 30);

        let config: AppConfig = toml::from_str("[ocr]\ntimeout_secs = 5").unwrap();
        assert_eq!(config.ocr.timeout_secs, 5);
        assert_eq!(config.ocr.language, "eng");
    }
}
