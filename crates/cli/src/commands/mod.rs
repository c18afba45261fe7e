//! CLI command implementations.

pub mod index;
pub mod migrate;
pub mod slugs;

use brico_storefront::catalog::CatalogError;
use brico_storefront::config::{ConfigError, StorefrontConfig};
use brico_storefront::db::{self, PgCatalogStore};
use brico_storefront::search::{MeiliBackend, SearchError};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

/// Errors any command can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("{0} product(s) still have no slug")]
    MissingSlugs(usize),
}

/// Load configuration and open the catalog store.
async fn open_store() -> Result<(StorefrontConfig, PgCatalogStore), CommandError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, PgCatalogStore::new(pool)))
}

/// Build the search client described by `config`.
fn open_index(config: &StorefrontConfig) -> Result<MeiliBackend, CommandError> {
    let backend = MeiliBackend::new(
        config.meili.host.as_str().trim_end_matches('/'),
        config.meili.master_key.as_ref().map(|key| key.expose_secret()),
        &config.meili.index,
    )?;
    tracing::info!(index = backend.index_uid(), "Search client created");
    Ok(backend)
}

/// Print a command report as pretty JSON on stdout.
fn print_report<T: Serialize>(report: &T) -> Result<(), CommandError> {
    let json = serde_json::to_string_pretty(report).map_err(|source| CommandError::Json {
        path: "<report>".to_string(),
        source,
    })?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
