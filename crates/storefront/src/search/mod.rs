//! Full-text product search over an external index.
//!
//! The index holds one flattened [`SearchDocument`] per product and is
//! disposable: it is rebuilt from the relational catalog on demand
//! ([`Indexer::reindex_all`]) and kept fresh by single-record upserts after
//! catalog writes ([`Indexer::upsert_product`]).
//!
//! Queries use the same filter and sort vocabulary as category browsing,
//! translated into the index's filter syntax by [`FilterExpr`]. Results are
//! normalized to the shared listing [`Card`].
//!
//! [`SearchDocument`]: brico_core::SearchDocument

mod filter;
mod indexer;
mod meili;
mod projection;
mod settings;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use brico_core::{Card, ProductId, SearchDocument, Slug};

pub use filter::{Clause, Direction, FilterExpr, FilterValue, SearchSort, attr};
pub use indexer::{DEFAULT_BATCH_SIZE, Indexer, IndexerOptions, ReindexReport, spawn_reindex};
pub use meili::MeiliBackend;
pub use projection::to_search_document;
pub use settings::{IndexSettings, STOP_WORDS_FILE, SYNONYMS_FILE};

use crate::catalog::{CatalogError, clamp_page, clamp_page_size};
use crate::db::RepositoryError;

/// Facets requested with every search.
pub const SEARCH_FACETS: [&str; 4] = [
    attr::CATEGORY,
    attr::SUBCATEGORY,
    attr::BRAND,
    attr::IN_STOCK,
];

/// Attributes returned with match highlighting.
pub const HIGHLIGHT_ATTRIBUTES: [&str; 2] = ["title", "brand"];

/// Attributes cropped around the match.
pub const CROP_ATTRIBUTES: [&str; 1] = ["description"];

/// Words kept around the match when cropping.
pub const CROP_LENGTH: usize = 20;

const DEFAULT_SUGGEST_LIMIT: u32 = 8;
const MAX_SUGGEST_LIMIT: u32 = 20;
const SUGGESTED_FACET_VALUES: usize = 5;

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The index is unreachable or rejected a request.
    #[error("search backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Reading the catalog for indexing failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<RepositoryError> for SearchError {
    fn from(err: RepositoryError) -> Self {
        Self::Catalog(err.into())
    }
}

/// A query as the index sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    pub text: String,
    pub filter: FilterExpr,
    pub sort: Option<SearchSort>,
    /// 1-based.
    pub page: u32,
    pub hits_per_page: u32,
    pub facets: Vec<&'static str>,
    pub highlight: Vec<&'static str>,
    pub crop: Vec<&'static str>,
    pub crop_length: usize,
    pub show_matches_position: bool,
}

impl IndexQuery {
    /// A plain text query for the first page, no extras.
    #[must_use]
    pub fn text(text: impl Into<String>, hits_per_page: u32) -> Self {
        Self {
            text: text.into(),
            filter: FilterExpr::default(),
            sort: None,
            page: 1,
            hits_per_page,
            facets: Vec::new(),
            highlight: Vec::new(),
            crop: Vec::new(),
            crop_length: CROP_LENGTH,
            show_matches_position: false,
        }
    }
}

/// A matched span inside an attribute value, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub start: usize,
    pub length: usize,
}

/// A hit as stored in the index. Every field is optional so incomplete
/// documents deserialize and can be dropped during shaping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HitDocument {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_ex_vat: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub image_url: Option<String>,
}

/// One raw hit from the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHit {
    pub document: HitDocument,
    /// Highlighted/cropped string values keyed by attribute.
    pub formatted: BTreeMap<String, String>,
    pub matches_position: BTreeMap<String, Vec<Highlight>>,
}

/// Value counts per facet attribute.
pub type FacetDistribution = BTreeMap<String, BTreeMap<String, u64>>;

/// The index's answer to an [`IndexQuery`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexResponse {
    pub hits: Vec<RawHit>,
    pub total_hits: u64,
    pub total_pages: u64,
    pub page: u32,
    pub facet_distribution: FacetDistribution,
}

/// The search index seam.
///
/// Writes are acknowledged once the index has applied them, so a document
/// is searchable as soon as the returned future resolves.
pub trait SearchBackend: Send + Sync {
    /// Replace the index configuration.
    fn apply_settings(
        &self,
        settings: &IndexSettings,
    ) -> impl Future<Output = Result<(), SearchError>> + Send;

    /// Add or replace documents by primary key.
    fn replace_documents(
        &self,
        documents: &[SearchDocument],
    ) -> impl Future<Output = Result<(), SearchError>> + Send;

    fn delete_all_documents(&self) -> impl Future<Output = Result<(), SearchError>> + Send;

    fn delete_document(&self, id: &str) -> impl Future<Output = Result<(), SearchError>> + Send;

    fn search(
        &self,
        query: &IndexQuery,
    ) -> impl Future<Output = Result<IndexResponse, SearchError>> + Send;

    fn is_healthy(&self) -> impl Future<Output = bool> + Send;
}

/// Optional search filters; a field left at its default does not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brands: Vec<String>,
    /// Only in-stock products when set.
    pub in_stock: bool,
    /// Inclusive bounds on the tax-inclusive price.
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

/// A storefront search request. Page values are clamped, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub text: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort: SearchSort,
    pub filters: SearchFilters,
}

/// One rendered search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub card: Card,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Cropped description around the match, when available.
    pub snippet: Option<String>,
    /// Highlighted values (title, brand) with matches wrapped in `<em>`.
    pub formatted: BTreeMap<String, String>,
    pub highlights: BTreeMap<String, Vec<Highlight>>,
}

/// A page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    /// As reported by the index; may exceed the renderable hits on a page
    /// when incomplete documents were dropped.
    pub total_hits: u64,
    pub total_pages: u64,
    pub hits: Vec<SearchHit>,
    pub facet_distribution: FacetDistribution,
}

/// Autocomplete suggestions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub query: String,
    pub suggestions: Vec<Card>,
    /// Up to five distinct categories among the suggestions.
    pub categories: Vec<String>,
    /// Up to five distinct brands among the suggestions.
    pub brands: Vec<String>,
}

/// Convert a raw hit into a card, or `None` when the id is missing or not
/// an integer, or when the slug or title is missing or blank.
fn hit_card(document: &HitDocument) -> Option<Card> {
    let id: ProductId = document.id.as_deref()?.parse().ok()?;
    let slug = document.slug.as_deref().filter(|s| !s.trim().is_empty())?;
    let title = document.title.as_deref().filter(|s| !s.trim().is_empty())?;
    let in_stock = document.in_stock.unwrap_or(false);

    Some(Card {
        id,
        slug: Some(Slug::from_trusted(slug)),
        name: title.to_owned(),
        brand: document.brand.clone(),
        price_ex_vat: document
            .price_ex_vat
            .or(document.price)
            .unwrap_or_default(),
        price_inc_vat: document.price,
        in_stock,
        stock: None,
        image_url: document.image_url.clone(),
    })
}

/// Keep renderable hits, logging each dropped one.
fn renderable(hits: Vec<RawHit>) -> impl Iterator<Item = (Card, RawHit)> {
    hits.into_iter().filter_map(|hit| match hit_card(&hit.document) {
        Some(card) => Some((card, hit)),
        None => {
            warn!(
                document_id = hit.document.id.as_deref().unwrap_or("<missing>"),
                "dropping search hit with missing or non-numeric id, or missing slug or title"
            );
            None
        }
    })
}

/// Product search service.
pub struct ProductSearch<'a, B> {
    backend: &'a B,
}

impl<'a, B: SearchBackend> ProductSearch<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Run a filtered, sorted, paginated search with facets and highlighting.
    ///
    /// Hits missing a slug or title are dropped without adjusting
    /// `total_hits`.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Backend` if the index is unavailable.
    #[instrument(skip(self, request), fields(query = %request.text))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let page = clamp_page(request.page);
        let page_size = clamp_page_size(request.page_size);

        let query = IndexQuery {
            text: request.text.trim().to_owned(),
            filter: FilterExpr::from_filters(&request.filters),
            sort: Some(request.sort),
            page,
            hits_per_page: page_size,
            facets: SEARCH_FACETS.to_vec(),
            highlight: HIGHLIGHT_ATTRIBUTES.to_vec(),
            crop: CROP_ATTRIBUTES.to_vec(),
            crop_length: CROP_LENGTH,
            show_matches_position: true,
        };

        let response = self.backend.search(&query).await?;

        let hits = renderable(response.hits)
            .map(|(card, hit)| {
                let mut formatted = hit.formatted;
                let snippet = formatted.remove("description");
                formatted.retain(|k, _| HIGHLIGHT_ATTRIBUTES.contains(&k.as_str()));
                SearchHit {
                    card,
                    category: hit.document.category,
                    subcategory: hit.document.subcategory,
                    snippet,
                    formatted,
                    highlights: hit.matches_position,
                }
            })
            .collect();

        Ok(SearchResults {
            query: query.text,
            page: response.page.max(1),
            page_size,
            total_hits: response.total_hits,
            total_pages: response.total_pages,
            hits,
            facet_distribution: response.facet_distribution,
        })
    }

    /// First-page suggestions for autocomplete. `limit` defaults to 8 and is
    /// clamped to `[1, 20]`.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Backend` if the index is unavailable.
    #[instrument(skip(self))]
    pub async fn suggest(&self, text: &str, limit: Option<i64>) -> Result<Suggestions, SearchError> {
        let limit = limit.map_or(DEFAULT_SUGGEST_LIMIT, |l| {
            u32::try_from(l.clamp(1, i64::from(MAX_SUGGEST_LIMIT))).unwrap_or(DEFAULT_SUGGEST_LIMIT)
        });
        let text = text.trim();

        let response = self.backend.search(&IndexQuery::text(text, limit)).await?;

        let mut categories = Vec::new();
        let mut brands = Vec::new();
        let mut seen_categories = BTreeSet::new();
        let mut seen_brands = BTreeSet::new();
        let mut suggestions = Vec::new();

        for (card, hit) in renderable(response.hits) {
            if let Some(category) = hit.document.category.filter(|c| !c.is_empty())
                && seen_categories.insert(category.clone())
                && categories.len() < SUGGESTED_FACET_VALUES
            {
                categories.push(category);
            }
            if let Some(brand) = hit.document.brand.filter(|b| !b.is_empty())
                && seen_brands.insert(brand.clone())
                && brands.len() < SUGGESTED_FACET_VALUES
            {
                brands.push(brand);
            }
            suggestions.push(card);
        }

        Ok(Suggestions {
            query: text.to_owned(),
            suggestions,
            categories,
            brands,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::MAX_PAGE_SIZE;
    use crate::test_support::{InMemoryIndex, document};

    #[tokio::test]
    async fn test_search_translates_filters_and_paginates() {
        let index = InMemoryIndex::new();
        for id in 1..=5 {
            let mut doc = document(id);
            doc.brand = Some(if id % 2 == 0 { "Bosch" } else { "Makita" }.to_owned());
            doc.price = Decimal::new(i64::from(id) * 10, 0);
            index.insert(doc);
        }

        let request = SearchRequest {
            sort: SearchSort::PriceDesc,
            page_size: Some(1),
            filters: SearchFilters {
                brands: vec!["Makita".to_owned()],
                ..SearchFilters::default()
            },
            ..SearchRequest::default()
        };

        let search = ProductSearch::new(&index);
        let results = search.search(&request).await.unwrap();

        assert_eq!(results.total_hits, 3);
        assert_eq!(results.total_pages, 3);
        assert_eq!(results.page, 1);
        let ids: Vec<_> = results.hits.iter().map(|h| h.card.id.as_i32()).collect();
        assert_eq!(ids, vec![5]);
        assert_eq!(results.facet_distribution["brand"]["Makita"], 3);

        let query = index.last_query().unwrap();
        assert_eq!(query.filter.to_filter_string().as_deref(), Some("brand IN [\"Makita\"]"));
        assert_eq!(query.sort, Some(SearchSort::PriceDesc));
        assert!(query.show_matches_position);
    }

    #[tokio::test]
    async fn test_incomplete_hits_dropped_but_counted() {
        let index = InMemoryIndex::new();
        index.insert(document(1));
        index.insert_raw(serde_json::json!({ "id": "2", "title": "Sin slug" }));
        index.insert_raw(serde_json::json!({ "id": "3", "slug": "sin-titulo" }));
        index.insert_raw(serde_json::json!({ "id": "abc", "slug": "x", "title": "X" }));

        let search = ProductSearch::new(&index);
        let results = search.search(&SearchRequest::default()).await.unwrap();

        assert_eq!(results.total_hits, 4);
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].card.id.as_i32(), 1);
    }

    #[tokio::test]
    async fn test_page_values_are_clamped() {
        let index = InMemoryIndex::new();
        let search = ProductSearch::new(&index);
        let request = SearchRequest {
            page: Some(-3),
            page_size: Some(1000),
            ..SearchRequest::default()
        };

        let results = search.search(&request).await.unwrap();
        assert_eq!(results.page, 1);
        assert_eq!(results.page_size, MAX_PAGE_SIZE);
        assert_eq!(index.last_query().unwrap().hits_per_page, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_suggest_collects_distinct_categories_and_brands() {
        let index = InMemoryIndex::new();
        for id in 1..=12 {
            let mut doc = document(id);
            doc.title = format!("Taladro {id}");
            doc.category = format!("cat-{}", id % 7);
            doc.brand = Some(format!("brand-{}", id % 3));
            index.insert(doc);
        }

        let search = ProductSearch::new(&index);
        let suggestions = search.suggest("taladro", None).await.unwrap();

        assert_eq!(suggestions.suggestions.len(), 8);
        assert_eq!(suggestions.categories.len(), 5);
        assert_eq!(suggestions.brands.len(), 3);
        assert_eq!(index.last_query().unwrap().hits_per_page, 8);

        search.suggest("taladro", Some(500)).await.unwrap();
        assert_eq!(index.last_query().unwrap().hits_per_page, 20);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let index = InMemoryIndex::new();
        index.set_unavailable(true);
        let search = ProductSearch::new(&index);
        let result = search.search(&SearchRequest::default()).await;
        assert!(matches!(result, Err(SearchError::Backend(_))));
    }
}
