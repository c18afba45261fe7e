//! Category browsing over the relational catalog.
//!
//! [`Catalog`] is a borrowed, per-request service in the style of the
//! database repositories: it holds a reference to a [`CatalogStore`] and the
//! options resolved from configuration, and each operation is a
//! self-contained read.
//!
//! # Listing pipeline
//!
//! 1. Resolve the category slug (unknown slug is an empty page, not an error)
//! 2. Expand the descendant set ([`Catalog::descendant_ids`])
//! 3. Fetch every matching row in group order ([`CatalogStore::listing_rows`])
//! 4. Collapse variants ([`group_variants`])
//! 5. Sort the representatives, count groups, slice the page

mod detail;
mod facets;
mod grouping;
mod planner;
mod slugs;
mod store;
mod tree;

use brico_core::{Card, Locale, Product};

pub use detail::{ProductDetail, VariantSummary};
pub use facets::CategoryFacets;
pub use grouping::{GroupKey, group_variants, sort_for_grouping};
pub use planner::{
    DEFAULT_PAGE_SIZE, ListingFilters, ListingPage, ListingRequest, ListingSort, MAX_PAGE_SIZE,
    clamp_page, clamp_page_size,
};
pub use slugs::{BACKFILL_BATCH_SIZE, BackfillReport, pick_title};
pub use store::{CatalogStore, ListingScope};

use crate::db::RepositoryError;

/// Errors from catalog operations.
///
/// There is no not-found variant: unknown slugs produce empty results.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Tunables for catalog reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Maximum number of tree levels expanded below a category.
    pub max_category_depth: usize,
    /// Language used when a product has no text in the requested locale.
    pub fallback_locale: Locale,
    /// Image CDN account; images are served from their source URL without it.
    pub cdn_cloud_name: Option<String>,
}

impl CatalogOptions {
    pub const DEFAULT_MAX_CATEGORY_DEPTH: usize = 5;
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            max_category_depth: Self::DEFAULT_MAX_CATEGORY_DEPTH,
            fallback_locale: Locale::default(),
            cdn_cloud_name: None,
        }
    }
}

/// Catalog read service.
pub struct Catalog<'a, S> {
    store: &'a S,
    options: CatalogOptions,
}

impl<'a, S: CatalogStore> Catalog<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, options: CatalogOptions) -> Self {
        Self { store, options }
    }

    #[must_use]
    pub const fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// Locales to load text for: the requested one and the fallback.
    fn locales(&self, locale: Locale) -> Vec<Locale> {
        if locale == self.options.fallback_locale {
            vec![locale]
        } else {
            vec![locale, self.options.fallback_locale]
        }
    }

    fn card(&self, product: &Product, locale: Locale) -> Card {
        let mut card = Card::from_product(product, locale, self.options.fallback_locale);
        card.image_url = product
            .primary_image()
            .map(|img| img.display_url(self.options.cdn_cloud_name.as_deref()));
        card
    }
}
