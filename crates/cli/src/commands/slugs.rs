//! Product slug maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Give every product without a slug a unique one
//! brico-cli slugs backfill
//!
//! # Fail when any product still lacks a slug
//! brico-cli slugs check
//! ```

use brico_storefront::catalog::{BACKFILL_BATCH_SIZE, Catalog};

use super::{CommandError, open_store, print_report};

/// Assign slugs in batches and print how many were written.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn backfill(batch_size: Option<u32>) -> Result<(), CommandError> {
    let (config, store) = open_store().await?;
    let catalog = Catalog::new(&store, config.catalog_options());

    let report = catalog
        .backfill_slugs(batch_size.unwrap_or(BACKFILL_BATCH_SIZE))
        .await?;
    tracing::info!(
        assigned = report.assigned,
        fallbacks = report.fallbacks,
        "Slug backfill complete"
    );
    print_report(&report)
}

/// Report products without a slug.
///
/// # Errors
///
/// Returns `CommandError::MissingSlugs` when any are found.
pub async fn check(limit: u32) -> Result<(), CommandError> {
    let (config, store) = open_store().await?;
    let catalog = Catalog::new(&store, config.catalog_options());

    let missing = catalog.missing_slugs(limit).await?;
    if missing.is_empty() {
        tracing::info!("All products have a slug");
        return Ok(());
    }

    for id in &missing {
        tracing::warn!(product_id = %id, "missing slug");
    }
    Err(CommandError::MissingSlugs(missing.len()))
}
