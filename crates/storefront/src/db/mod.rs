//! Database operations for the catalog `PostgreSQL` store.
//!
//! # Schema: `catalog`
//!
//! Owned by the batch import; the storefront only reads it, apart from the
//! slug backfill which writes `product.slug`.
//!
//! ## Tables
//!
//! - `category` - Category tree (`parent_id` null for roots)
//! - `product` - Sellable items, optionally grouped into variant groups
//! - `product_i18n` - Localized names/descriptions, one row per language
//! - `product_image` - Product images, unique per `(product_id, url)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p brico-cli -- migrate
//! ```

mod catalog;
mod rows;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use catalog::PgCatalogStore;

/// Errors from relational store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Query failed or the database is unreachable.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped to a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Map a write error, turning unique violations into `Conflict`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
