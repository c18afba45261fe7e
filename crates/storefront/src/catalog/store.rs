//! The relational store seam.
//!
//! The catalog services only ever talk to the store through this trait, so
//! the Postgres implementation in [`crate::db`] and the in-memory one used in
//! tests are interchangeable.

use std::future::Future;

use brico_core::{
    Category, CategoryId, GroupId, IndexableProduct, Locale, Product, ProductId, Slug,
};

use super::{CategoryFacets, ListingFilters};
use crate::db::RepositoryError;

/// What a category listing fetches: the category scope, the active filters,
/// and the locales whose localized text should be loaded.
#[derive(Debug, Clone, Copy)]
pub struct ListingScope<'a> {
    pub categories: &'a [CategoryId],
    pub filters: &'a ListingFilters,
    pub locales: &'a [Locale],
}

/// Read access to the catalog, plus the single write the storefront owns
/// (slug assignment).
///
/// Every method is one round trip (or a fixed handful) against the store.
/// Errors are never swallowed: an unreachable store must surface as `Err`,
/// not as an empty result.
pub trait CatalogStore: Send + Sync {
    /// Look up a category by its unique slug.
    fn category_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Category>, RepositoryError>> + Send;

    /// Ids of every category whose parent is in `parents` (one tree level).
    fn child_category_ids(
        &self,
        parents: &[CategoryId],
    ) -> impl Future<Output = Result<Vec<CategoryId>, RepositoryError>> + Send;

    /// Direct children of a category, ordered by name.
    fn child_categories(
        &self,
        parent: CategoryId,
    ) -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    /// Root categories, ordered by name.
    fn root_categories(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    /// Every product matching the scope, ordered by
    /// `(group_id ASC NULLS LAST, group_order ASC NULLS LAST, id ASC)`, each
    /// with at most its first image and the texts for `scope.locales`.
    fn listing_rows(
        &self,
        scope: ListingScope<'_>,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// Aggregates over the products filed under `categories`. Brands are
    /// returned raw (distinct, non-null); the caller normalizes them.
    fn facets(
        &self,
        categories: &[CategoryId],
    ) -> impl Future<Output = Result<CategoryFacets, RepositoryError>> + Send;

    /// Newest products by id, with their first image.
    fn latest_products(
        &self,
        limit: u32,
        locales: &[Locale],
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// A product by slug with all of its images.
    fn product_by_slug(
        &self,
        slug: &str,
        locales: &[Locale],
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Members of a variant group ordered by `(group_order, id)`, without images.
    fn group_members(
        &self,
        group: GroupId,
        locales: &[Locale],
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// One page of products for reindexing, keyset-paginated by id.
    fn indexable_products(
        &self,
        after: Option<ProductId>,
        limit: u32,
        locales: &[Locale],
    ) -> impl Future<Output = Result<Vec<IndexableProduct>, RepositoryError>> + Send;

    /// A single product for upsert-on-write.
    fn indexable_product(
        &self,
        id: ProductId,
        locales: &[Locale],
    ) -> impl Future<Output = Result<Option<IndexableProduct>, RepositoryError>> + Send;

    /// Products whose slug is null or empty, ordered by id, with all texts.
    fn products_missing_slug(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// Set a product's slug.
    ///
    /// Returns `RepositoryError::Conflict` when another product already
    /// holds the slug.
    fn assign_slug(
        &self,
        id: ProductId,
        slug: &Slug,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
