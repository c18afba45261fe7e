//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `MEILI_HOST` - Meilisearch URL (default: <http://127.0.0.1:7700>)
//! - `MEILI_MASTER_KEY` - Meilisearch API key
//! - `MEILI_INDEX_PRODUCTS` - Product index uid (default: products)
//! - `CATALOG_MAX_CATEGORY_DEPTH` - Tree levels expanded below a category (default: 5)
//! - `CATALOG_DEFAULT_LOCALE` - Fallback language for product text (default: es)
//! - `CDN_CLOUD_NAME` - Image CDN account; source URLs are served without it
//! - `SEARCH_DATA_DIR` - Directory holding `synonyms.json` / `stopwords.json` (default: data/search)
//! - `REINDEX_BATCH_SIZE` - Products per reindex batch (default: 1000)
//! - `REINDEX_TOKEN` - Bearer token for `POST /api/reindex` (endpoint disabled when unset)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use brico_core::Locale;

use crate::catalog::CatalogOptions;
use crate::search::{DEFAULT_BATCH_SIZE, IndexerOptions};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MAX_CATEGORY_DEPTH_LIMIT: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Search index connection
    pub meili: MeiliConfig,
    /// Catalog read tunables
    pub catalog: CatalogConfig,
    /// Reindex job settings
    pub reindex: ReindexConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Meilisearch connection.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct MeiliConfig {
    pub host: Url,
    pub master_key: Option<SecretString>,
    /// Product index uid
    pub index: String,
}

impl std::fmt::Debug for MeiliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeiliConfig")
            .field("host", &self.host.as_str())
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field("index", &self.index)
            .finish()
    }
}

/// Catalog read tunables.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub max_category_depth: usize,
    pub default_locale: Locale,
    pub cdn_cloud_name: Option<String>,
}

/// Reindex job settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ReindexConfig {
    pub batch_size: u32,
    /// `None` disables the HTTP trigger.
    pub token: Option<SecretString>,
    pub search_data_dir: PathBuf,
}

impl std::fmt::Debug for ReindexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReindexConfig")
            .field("batch_size", &self.batch_size)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("search_data_dir", &self.search_data_dir)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;

        Ok(Self {
            database_url,
            host,
            port,
            meili: MeiliConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
            reindex: ReindexConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            max_category_depth: self.catalog.max_category_depth,
            fallback_locale: self.catalog.default_locale,
            cdn_cloud_name: self.catalog.cdn_cloud_name.clone(),
        }
    }

    #[must_use]
    pub fn indexer_options(&self) -> IndexerOptions {
        IndexerOptions {
            batch_size: self.reindex.batch_size,
            locale: self.catalog.default_locale,
            cdn_cloud_name: self.catalog.cdn_cloud_name.clone(),
        }
    }
}

impl MeiliConfig {
    /// Load the search index connection on its own (the CLI needs no HTTP settings).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `MEILI_HOST` is not a URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = get_env_or_default("MEILI_HOST", "http://127.0.0.1:7700");
        let host = Url::parse(&host)
            .map_err(|e| ConfigError::InvalidEnvVar("MEILI_HOST".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            master_key: get_optional_env("MEILI_MASTER_KEY").map(SecretString::from),
            index: get_env_or_default("MEILI_INDEX_PRODUCTS", "products"),
        })
    }
}

impl CatalogConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for an unparsable or out-of-range value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_category_depth: usize = parse_env_or_default(
            "CATALOG_MAX_CATEGORY_DEPTH",
            &CatalogOptions::DEFAULT_MAX_CATEGORY_DEPTH.to_string(),
        )?;
        if !(1..=MAX_CATEGORY_DEPTH_LIMIT).contains(&max_category_depth) {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_MAX_CATEGORY_DEPTH".to_string(),
                format!("must be between 1 and {MAX_CATEGORY_DEPTH_LIMIT}"),
            ));
        }

        let default_locale = Locale::parse(&get_env_or_default("CATALOG_DEFAULT_LOCALE", "es"))
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CATALOG_DEFAULT_LOCALE".to_string(), e.to_string())
            })?;

        Ok(Self {
            max_category_depth,
            default_locale,
            cdn_cloud_name: get_optional_env("CDN_CLOUD_NAME").filter(|s| !s.trim().is_empty()),
        })
    }
}

impl ReindexConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` for a bad batch size or a weak token.
    pub fn from_env() -> Result<Self, ConfigError> {
        let batch_size: u32 =
            parse_env_or_default("REINDEX_BATCH_SIZE", &DEFAULT_BATCH_SIZE.to_string())?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REINDEX_BATCH_SIZE".to_string(),
                "must be positive".to_string(),
            ));
        }

        let token = match get_optional_env("REINDEX_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "REINDEX_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            batch_size,
            token,
            search_data_dir: PathBuf::from(get_env_or_default("SEARCH_DATA_DIR", "data/search")),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., STOREFRONT_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, or the default when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            meili: MeiliConfig {
                host: Url::parse("http://127.0.0.1:7700").unwrap(),
                master_key: Some(SecretString::from("super_secret_meili_key")),
                index: "products".to_string(),
            },
            catalog: CatalogConfig {
                max_category_depth: 7,
                default_locale: Locale::En,
                cdn_cloud_name: Some("brico".to_string()),
            },
            reindex: ReindexConfig {
                batch_size: 250,
                token: Some(SecretString::from("super_secret_reindex_token")),
                search_data_dir: PathBuf::from("data/search"),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-reindex-token", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_value() {
        let depth: usize = parse_value("CATALOG_MAX_CATEGORY_DEPTH", " 6 ").unwrap();
        assert_eq!(depth, 6);

        let bad: Result<u16, _> = parse_value("STOREFRONT_PORT", "http");
        assert!(matches!(bad, Err(ConfigError::InvalidEnvVar(key, _)) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_service_options_follow_config() {
        let config = config();

        let catalog = config.catalog_options();
        assert_eq!(catalog.max_category_depth, 7);
        assert_eq!(catalog.fallback_locale, Locale::En);
        assert_eq!(catalog.cdn_cloud_name.as_deref(), Some("brico"));

        let indexer = config.indexer_options();
        assert_eq!(indexer.batch_size, 250);
        assert_eq!(indexer.locale, Locale::En);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());

        assert!(debug_output.contains("products"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_meili_key"));
        assert!(!debug_output.contains("super_secret_reindex_token"));
    }
}
