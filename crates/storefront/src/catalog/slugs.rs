//! Product slug backfill.
//!
//! Slugs are assigned once, after import, by the CLI (`brico-cli slugs
//! backfill`). They are built by [`make_unique_slug`] from the product's best
//! available title plus its reference code (or id), so collisions can only
//! come from two products whose reference codes slugify identically. Those
//! are retried with the id-only suffix.

use serde::Serialize;
use tracing::{info, instrument, warn};

use brico_core::{Locale, Product, ProductId, make_unique_slug};

use super::{Catalog, CatalogError, CatalogStore};
use crate::db::RepositoryError;

/// Products processed per store round trip.
pub const BACKFILL_BATCH_SIZE: u32 = 500;

/// Outcome of a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Products that received a slug.
    pub assigned: u64,
    /// Of those, how many needed the id-only fallback.
    pub fallbacks: u64,
}

/// Title a slug is built from: default-locale name, then any localized
/// name, then the base name, then the reference code, then `producto-{id}`.
#[must_use]
pub fn pick_title(product: &Product, default_locale: Locale) -> String {
    fn non_blank(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    non_blank(
        product
            .text_for(default_locale)
            .and_then(|t| t.name.as_deref()),
    )
    .or_else(|| {
        product
            .texts
            .iter()
            .find_map(|t| non_blank(t.name.as_deref()))
    })
    .or_else(|| non_blank(product.name.as_deref()))
    .or_else(|| non_blank(product.reference.as_deref()))
    .map_or_else(|| format!("producto-{}", product.id), str::to_owned)
}

impl<S: CatalogStore> Catalog<'_, S> {
    /// Assign a slug to every product that lacks one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails, or if the
    /// id-only fallback slug also collides.
    #[instrument(skip(self))]
    pub async fn backfill_slugs(&self, batch_size: u32) -> Result<BackfillReport, CatalogError> {
        let batch_size = batch_size.max(1);
        let mut report = BackfillReport::default();

        loop {
            let batch = self.store.products_missing_slug(batch_size).await?;
            if batch.is_empty() {
                break;
            }

            for product in &batch {
                let title = pick_title(product, self.options.fallback_locale);
                let slug = make_unique_slug(&title, product.reference.as_deref(), product.id.as_i32());

                match self.store.assign_slug(product.id, &slug).await {
                    Ok(()) => {}
                    Err(RepositoryError::Conflict(_)) => {
                        let fallback = make_unique_slug(&title, None, product.id.as_i32());
                        warn!(product_id = %product.id, %slug, %fallback, "slug taken, using id suffix");
                        self.store.assign_slug(product.id, &fallback).await?;
                        report.fallbacks += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
                report.assigned += 1;
            }

            info!(assigned = report.assigned, "slug batch done");
        }

        Ok(report)
    }

    /// Ids of products still missing a slug (at most `limit`).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn missing_slugs(&self, limit: u32) -> Result<Vec<ProductId>, CatalogError> {
        let products = self.store.products_missing_slug(limit).await?;
        Ok(products.iter().map(|p| p.id).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOptions;
    use crate::test_support::{InMemoryCatalog, product};
    use brico_core::{ProductText, Slug};

    fn text(locale: Locale, name: &str) -> ProductText {
        ProductText {
            locale,
            name: Some(name.to_owned()),
            description: None,
        }
    }

    #[test]
    fn test_pick_title_order() {
        let mut p = product(7);
        p.texts = vec![text(Locale::En, "Hammer"), text(Locale::Es, "Martillo")];
        assert_eq!(pick_title(&p, Locale::Es), "Martillo");

        p.texts = vec![text(Locale::En, "Hammer")];
        assert_eq!(pick_title(&p, Locale::Es), "Hammer");

        p.texts.clear();
        assert_eq!(pick_title(&p, Locale::Es), "Producto base 7");

        p.name = None;
        p.reference = Some(" REF-7 ".to_owned());
        assert_eq!(pick_title(&p, Locale::Es), "REF-7");

        p.reference = None;
        assert_eq!(pick_title(&p, Locale::Es), "producto-7");
    }

    #[tokio::test]
    async fn test_backfill_assigns_distinct_slugs() {
        let store = InMemoryCatalog::new();
        let mut a = product(1);
        a.name = Some("Martillo".to_owned());
        a.reference = Some("M-1".to_owned());
        let mut b = product(2);
        b.name = Some("Martillo".to_owned());
        let mut c = product(3);
        c.name = None;
        store.add_product(a);
        store.add_product(b);
        store.add_product(c);

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let report = catalog.backfill_slugs(2).await.unwrap();
        assert_eq!(report.assigned, 3);
        assert_eq!(report.fallbacks, 0);

        let slugs: Vec<_> = (1..=3)
            .map(|id| store.product(ProductId::new(id)).unwrap().slug.unwrap())
            .collect();
        assert_eq!(slugs[0].as_str(), "martillo-m-1");
        assert_eq!(slugs[1].as_str(), "martillo-2");
        assert_eq!(slugs[2].as_str(), "producto-3-3");
        assert!(catalog.missing_slugs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backfill_falls_back_to_id_on_conflict() {
        let store = InMemoryCatalog::new();
        let mut taken = product(1);
        taken.slug = Some(Slug::from_trusted("brocha-x-1"));
        store.add_product(taken);

        let mut p = product(2);
        p.name = Some("Brocha".to_owned());
        p.reference = Some("X 1".to_owned());
        store.add_product(p);

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let report = catalog.backfill_slugs(BACKFILL_BATCH_SIZE).await.unwrap();
        assert_eq!(report.assigned, 1);
        assert_eq!(report.fallbacks, 1);
        assert_eq!(
            store.product(ProductId::new(2)).unwrap().slug.unwrap().as_str(),
            "brocha-2"
        );
    }
}
