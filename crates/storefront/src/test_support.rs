//! In-memory collaborators for tests.
//!
//! [`InMemoryCatalog`] and [`InMemoryIndex`] implement the store and index
//! seams with the same ordering and filtering contracts as Postgres and
//! Meilisearch, so services can be exercised without either running.
//! Compiled for unit tests and behind the `test-support` feature for the
//! integration-test crate.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use brico_core::{
    Category, CategoryId, CategoryPlacement, GroupId, IndexableProduct, Locale, Product,
    ProductId, SearchDocument, Slug,
};

use crate::catalog::{CatalogStore, CategoryFacets, ListingScope, sort_for_grouping};
use crate::db::RepositoryError;
use crate::search::{
    Clause, Direction, FacetDistribution, FilterValue, Highlight, HitDocument, IndexQuery,
    IndexResponse, IndexSettings, RawHit, SearchBackend, SearchError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fixture_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// A category named after its slug.
#[must_use]
pub fn category(id: i32, slug: &str, parent: Option<i32>) -> Category {
    Category {
        id: CategoryId::new(id),
        name: slug.to_owned(),
        slug: Slug::from_trusted(slug),
        parent_id: parent.map(CategoryId::new),
    }
}

/// An uncategorized, ungrouped product named `Producto base {id}` priced 10,
/// with no stock, slug, images or localized text.
#[must_use]
pub fn product(id: i32) -> Product {
    let ts = fixture_timestamp();
    Product {
        id: ProductId::new(id),
        reference: None,
        name: Some(format!("Producto base {id}")),
        texts: Vec::new(),
        brand: None,
        price_ex_vat: Decimal::new(10, 0),
        vat_rate: None,
        stock: None,
        category_id: None,
        images: Vec::new(),
        group_id: None,
        group_order: None,
        slug: None,
        created_at: ts,
        updated_at: ts,
    }
}

/// A complete, renderable search document.
#[must_use]
pub fn document(id: i32) -> SearchDocument {
    let ts = fixture_timestamp().to_rfc3339();
    SearchDocument {
        id: id.to_string(),
        slug: Some(format!("producto-{id}")),
        title: format!("Producto {id}"),
        description: None,
        brand: None,
        category: CategoryPlacement::UNCATEGORIZED.to_owned(),
        subcategory: None,
        price: Decimal::new(10, 0),
        price_ex_vat: Decimal::new(10, 0),
        in_stock: true,
        image_url: None,
        created_at: ts.clone(),
        updated_at: ts,
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
}

/// A [`CatalogStore`] over in-memory maps. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a category by id.
    pub fn add_category(&self, category: Category) {
        lock(&self.state).categories.insert(category.id, category);
    }

    /// Insert or replace a product by id.
    pub fn add_product(&self, product: Product) {
        lock(&self.state).products.insert(product.id, product);
    }

    /// A stored product exactly as held, with every text and image.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        lock(&self.state).products.get(&id).cloned()
    }

    pub fn remove_product(&self, id: ProductId) {
        lock(&self.state).products.remove(&id);
    }
}

fn with_locales(mut product: Product, locales: &[Locale]) -> Product {
    product.texts.retain(|t| locales.contains(&t.locale));
    product
}

fn with_first_image(mut product: Product) -> Product {
    product.images = product.primary_image().cloned().into_iter().collect();
    product
}

fn by_name(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    categories
}

fn placement(state: &CatalogState, product: &Product) -> Option<CategoryPlacement> {
    let category = state.categories.get(&product.category_id?)?;
    let parent_slug = category
        .parent_id
        .and_then(|id| state.categories.get(&id))
        .map(|parent| parent.slug.clone());
    Some(CategoryPlacement {
        slug: category.slug.clone(),
        parent_slug,
    })
}

fn indexable(state: &CatalogState, product: &Product, locales: &[Locale]) -> IndexableProduct {
    IndexableProduct {
        category: placement(state, product),
        product: with_first_image(with_locales(product.clone(), locales)),
    }
}

fn limit(n: u32) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

impl CatalogStore for InMemoryCatalog {
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .categories
            .values()
            .find(|c| c.slug.as_str() == slug)
            .cloned())
    }

    async fn child_category_ids(
        &self,
        parents: &[CategoryId],
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .categories
            .values()
            .filter(|c| c.parent_id.is_some_and(|p| parents.contains(&p)))
            .map(|c| c.id)
            .collect())
    }

    async fn child_categories(&self, parent: CategoryId) -> Result<Vec<Category>, RepositoryError> {
        let state = lock(&self.state);
        Ok(by_name(
            state
                .categories
                .values()
                .filter(|c| c.parent_id == Some(parent))
                .cloned()
                .collect(),
        ))
    }

    async fn root_categories(&self, n: u32) -> Result<Vec<Category>, RepositoryError> {
        let state = lock(&self.state);
        let mut roots = by_name(state.categories.values().filter(|c| c.is_root()).cloned().collect());
        roots.truncate(limit(n));
        Ok(roots)
    }

    async fn listing_rows(&self, scope: ListingScope<'_>) -> Result<Vec<Product>, RepositoryError> {
        let state = lock(&self.state);
        let mut rows: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.category_id.is_some_and(|c| scope.categories.contains(&c)))
            .filter(|p| scope.filters.matches(p))
            .map(|p| with_first_image(with_locales(p.clone(), scope.locales)))
            .collect();
        sort_for_grouping(&mut rows);
        Ok(rows)
    }

    async fn facets(&self, categories: &[CategoryId]) -> Result<CategoryFacets, RepositoryError> {
        let state = lock(&self.state);
        let scoped: Vec<&Product> = state
            .products
            .values()
            .filter(|p| p.category_id.is_some_and(|c| categories.contains(&c)))
            .collect();

        let brands: BTreeSet<String> = scoped.iter().filter_map(|p| p.brand.clone()).collect();
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);

        Ok(CategoryFacets {
            brands: brands.into_iter().collect(),
            price_min: scoped.iter().map(|p| p.price_ex_vat).min(),
            price_max: scoped.iter().map(|p| p.price_ex_vat).max(),
            in_stock_count: count(scoped.iter().filter(|p| p.stock.unwrap_or(0) > 0).count()),
            total_count: count(scoped.len()),
        })
    }

    async fn latest_products(
        &self,
        n: u32,
        locales: &[Locale],
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .products
            .values()
            .rev()
            .take(limit(n))
            .map(|p| with_first_image(with_locales(p.clone(), locales)))
            .collect())
    }

    async fn product_by_slug(
        &self,
        slug: &str,
        locales: &[Locale],
    ) -> Result<Option<Product>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .products
            .values()
            .find(|p| p.slug.as_ref().is_some_and(|s| s.as_str() == slug))
            .map(|p| with_locales(p.clone(), locales)))
    }

    async fn group_members(
        &self,
        group: GroupId,
        locales: &[Locale],
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = lock(&self.state);
        let mut members: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.group_id == Some(group))
            .map(|p| {
                let mut p = with_locales(p.clone(), locales);
                p.images.clear();
                p
            })
            .collect();
        sort_for_grouping(&mut members);
        Ok(members)
    }

    async fn indexable_products(
        &self,
        after: Option<ProductId>,
        n: u32,
        locales: &[Locale],
    ) -> Result<Vec<IndexableProduct>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .products
            .values()
            .filter(|p| after.is_none_or(|a| p.id > a))
            .take(limit(n))
            .map(|p| indexable(&state, p, locales))
            .collect())
    }

    async fn indexable_product(
        &self,
        id: ProductId,
        locales: &[Locale],
    ) -> Result<Option<IndexableProduct>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .products
            .get(&id)
            .map(|p| indexable(&state, p, locales)))
    }

    async fn products_missing_slug(&self, n: u32) -> Result<Vec<Product>, RepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .products
            .values()
            .filter(|p| p.slug.as_ref().is_none_or(|s| s.as_str().is_empty()))
            .take(limit(n))
            .map(|p| {
                let mut p = p.clone();
                p.images.clear();
                p
            })
            .collect())
    }

    async fn assign_slug(&self, id: ProductId, slug: &Slug) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state);
        let taken = state
            .products
            .values()
            .any(|p| p.id != id && p.slug.as_ref() == Some(slug));
        if taken {
            return Err(RepositoryError::Conflict(format!("slug {slug} already assigned")));
        }
        if let Some(product) = state.products.get_mut(&id) {
            product.slug = Some(slug.clone());
        }
        Ok(())
    }
}

/// A [`CatalogStore`] whose every call fails as if the database were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCatalog;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
}

impl CatalogStore for FailingCatalog {
    async fn category_by_slug(&self, _: &str) -> Result<Option<Category>, RepositoryError> {
        unavailable()
    }

    async fn child_category_ids(&self, _: &[CategoryId]) -> Result<Vec<CategoryId>, RepositoryError> {
        unavailable()
    }

    async fn child_categories(&self, _: CategoryId) -> Result<Vec<Category>, RepositoryError> {
        unavailable()
    }

    async fn root_categories(&self, _: u32) -> Result<Vec<Category>, RepositoryError> {
        unavailable()
    }

    async fn listing_rows(&self, _: ListingScope<'_>) -> Result<Vec<Product>, RepositoryError> {
        unavailable()
    }

    async fn facets(&self, _: &[CategoryId]) -> Result<CategoryFacets, RepositoryError> {
        unavailable()
    }

    async fn latest_products(&self, _: u32, _: &[Locale]) -> Result<Vec<Product>, RepositoryError> {
        unavailable()
    }

    async fn product_by_slug(
        &self,
        _: &str,
        _: &[Locale],
    ) -> Result<Option<Product>, RepositoryError> {
        unavailable()
    }

    async fn group_members(&self, _: GroupId, _: &[Locale]) -> Result<Vec<Product>, RepositoryError> {
        unavailable()
    }

    async fn indexable_products(
        &self,
        _: Option<ProductId>,
        _: u32,
        _: &[Locale],
    ) -> Result<Vec<IndexableProduct>, RepositoryError> {
        unavailable()
    }

    async fn indexable_product(
        &self,
        _: ProductId,
        _: &[Locale],
    ) -> Result<Option<IndexableProduct>, RepositoryError> {
        unavailable()
    }

    async fn products_missing_slug(&self, _: u32) -> Result<Vec<Product>, RepositoryError> {
        unavailable()
    }

    async fn assign_slug(&self, _: ProductId, _: &Slug) -> Result<(), RepositoryError> {
        unavailable()
    }
}

#[derive(Debug, Default)]
struct IndexState {
    /// Documents in insertion order; a replace keeps the original position.
    documents: Vec<(String, Value)>,
    settings: Option<IndexSettings>,
    last_query: Option<IndexQuery>,
    unavailable: bool,
}

/// A [`SearchBackend`] that evaluates queries over in-memory JSON documents.
///
/// Text matches are case-insensitive substrings of the title (empty text
/// matches everything). Filter clauses, sorting, facet counts over the
/// filtered matches and 1-based pagination follow the real index. Without a
/// sort, hits come back in insertion order. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    state: Arc<Mutex<IndexState>>,
}

impl InMemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document by id.
    pub fn insert(&self, document: SearchDocument) {
        if let Ok(value) = serde_json::to_value(&document) {
            upsert(&mut lock(&self.state).documents, value);
        }
    }

    /// Add a raw, possibly incomplete document.
    pub fn insert_raw(&self, value: Value) {
        upsert(&mut lock(&self.state).documents, value);
    }

    /// Ids of the stored documents, in insertion order.
    #[must_use]
    pub fn document_ids(&self) -> Vec<String> {
        lock(&self.state)
            .documents
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    #[must_use]
    pub fn document(&self, id: &str) -> Option<Value> {
        lock(&self.state)
            .documents
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, v)| v.clone())
    }

    /// Settings from the last `apply_settings` call.
    #[must_use]
    pub fn settings(&self) -> Option<IndexSettings> {
        lock(&self.state).settings.clone()
    }

    #[must_use]
    pub fn last_query(&self) -> Option<IndexQuery> {
        lock(&self.state).last_query.clone()
    }

    /// Make every call fail with `SearchError::Backend`.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    fn check(state: &IndexState) -> Result<(), SearchError> {
        if state.unavailable {
            Err(SearchError::Backend("index unavailable".to_owned()))
        } else {
            Ok(())
        }
    }
}

fn doc_id(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn upsert(documents: &mut Vec<(String, Value)>, value: Value) {
    let id = doc_id(&value);
    match documents.iter_mut().find(|(existing, _)| *existing == id) {
        Some(slot) => slot.1 = value,
        None => documents.push((id, value)),
    }
}

fn matches_clause(doc: &Value, clause: &Clause) -> bool {
    match clause {
        Clause::Eq {
            field,
            value: FilterValue::Str(expected),
        } => doc.get(field).and_then(Value::as_str) == Some(expected.as_str()),
        Clause::Eq {
            field,
            value: FilterValue::Bool(expected),
        } => doc.get(field).and_then(Value::as_bool) == Some(*expected),
        Clause::In { field, values } => doc
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| values.iter().any(|x| x == v)),
        Clause::Gte { field, value } => {
            number(doc, field).is_some_and(|n| value.to_f64().is_some_and(|bound| n >= bound))
        }
        Clause::Lte { field, value } => {
            number(doc, field).is_some_and(|n| value.to_f64().is_some_and(|bound| n <= bound))
        }
    }
}

fn number(doc: &Value, field: &str) -> Option<f64> {
    doc.get(field).and_then(Value::as_f64)
}

fn matches_text(doc: &Value, needle: &str) -> bool {
    needle.is_empty()
        || doc
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|t| t.to_lowercase().contains(needle))
}

/// Present values first; numbers numerically, everything else as text.
fn compare_field(a: &Value, b: &Value, field: &str, direction: Direction) -> Ordering {
    let ordered = |x: &Value, y: &Value| match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => x.to_string().cmp(&y.to_string()),
    };
    match (a.get(field).filter(|v| !v.is_null()), b.get(field).filter(|v| !v.is_null())) {
        (Some(x), Some(y)) => match direction {
            Direction::Asc => ordered(x, y),
            Direction::Desc => ordered(y, x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn facet_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn to_raw_hit(doc: &Value, query: &IndexQuery, needle: &str) -> RawHit {
    let document: HitDocument = serde_json::from_value(doc.clone()).unwrap_or_default();

    let formatted = query
        .highlight
        .iter()
        .chain(&query.crop)
        .filter_map(|attr| {
            doc.get(*attr)
                .and_then(Value::as_str)
                .map(|s| ((*attr).to_owned(), s.to_owned()))
        })
        .collect();

    let mut matches_position = BTreeMap::new();
    if query.show_matches_position
        && !needle.is_empty()
        && let Some(start) = document
            .title
            .as_deref()
            .and_then(|t| t.to_lowercase().find(needle))
    {
        matches_position.insert(
            "title".to_owned(),
            vec![Highlight {
                start,
                length: needle.len(),
            }],
        );
    }

    RawHit {
        document,
        formatted,
        matches_position,
    }
}

impl SearchBackend for InMemoryIndex {
    async fn apply_settings(&self, settings: &IndexSettings) -> Result<(), SearchError> {
        let mut state = lock(&self.state);
        Self::check(&state)?;
        state.settings = Some(settings.clone());
        Ok(())
    }

    async fn replace_documents(&self, documents: &[SearchDocument]) -> Result<(), SearchError> {
        let mut state = lock(&self.state);
        Self::check(&state)?;
        for document in documents {
            let value = serde_json::to_value(document)?;
            upsert(&mut state.documents, value);
        }
        Ok(())
    }

    async fn delete_all_documents(&self) -> Result<(), SearchError> {
        let mut state = lock(&self.state);
        Self::check(&state)?;
        state.documents.clear();
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), SearchError> {
        let mut state = lock(&self.state);
        Self::check(&state)?;
        state.documents.retain(|(doc_id, _)| doc_id != id);
        Ok(())
    }

    async fn search(&self, query: &IndexQuery) -> Result<IndexResponse, SearchError> {
        let mut state = lock(&self.state);
        state.last_query = Some(query.clone());
        Self::check(&state)?;

        let needle = query.text.trim().to_lowercase();
        let mut matched: Vec<&Value> = state
            .documents
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| matches_text(doc, &needle))
            .filter(|doc| query.filter.clauses().iter().all(|c| matches_clause(doc, c)))
            .collect();

        if let Some(sort) = query.sort {
            let (field, direction) = sort.key();
            matched.sort_by(|a, b| compare_field(a, b, field, direction));
        }

        let mut facet_distribution = FacetDistribution::new();
        for facet in &query.facets {
            let counts = facet_distribution.entry((*facet).to_owned()).or_default();
            for value in matched.iter().filter_map(|doc| doc.get(*facet)).filter_map(facet_key) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        let per_page = limit(query.hits_per_page.max(1));
        let page = query.page.max(1);
        let offset = limit(page - 1).saturating_mul(per_page);
        let total = matched.len();

        let hits = matched
            .iter()
            .skip(offset)
            .take(per_page)
            .map(|doc| to_raw_hit(doc, query, &needle))
            .collect();

        Ok(IndexResponse {
            hits,
            total_hits: total as u64,
            total_pages: total.div_ceil(per_page) as u64,
            page,
            facet_distribution,
        })
    }

    async fn is_healthy(&self) -> bool {
        !lock(&self.state).unavailable
    }
}
