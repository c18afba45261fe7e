//! Category browsing and product detail handlers.

use axum::{
    Json,
    extract::{Path, Query, RawQuery, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use brico_core::{Card, Category, Locale};

use crate::catalog::{
    CatalogStore, CategoryFacets, ListingFilters, ListingPage, ListingRequest, ListingSort,
    ProductDetail,
};
use crate::error::{AppError, Result};
use crate::search::SearchBackend;
use crate::state::AppState;

/// Query parameters shared by the simpler catalog endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub lang: Option<String>,
    pub limit: Option<String>,
}

impl LocaleQuery {
    /// A negative or unparseable limit falls back to the default.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        self.limit.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

/// Parse a category listing query string.
///
/// `brand` may repeat. `inStock` is on for `1` or `true`. Unparsable
/// numbers are ignored rather than rejected.
#[must_use]
pub fn listing_request(slug: &str, raw_query: Option<&str>) -> ListingRequest {
    let mut lang = None;
    let mut sort = None;
    let mut page = None;
    let mut page_size = None;
    let mut filters = ListingFilters::default();

    for (key, value) in url::form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes()) {
        let value = value.trim();
        match key.as_ref() {
            "lang" => lang = Some(value.to_owned()),
            "sort" => sort = Some(value.to_owned()),
            "page" => page = value.parse::<i64>().ok(),
            "pageSize" => page_size = value.parse::<i64>().ok(),
            "brand" if !value.is_empty() => filters.brands.push(value.to_owned()),
            "inStock" => filters.in_stock = matches!(value, "1" | "true"),
            "priceMin" => filters.price_min = value.parse::<Decimal>().ok(),
            "priceMax" => filters.price_max = value.parse::<Decimal>().ok(),
            _ => {}
        }
    }

    ListingRequest {
        category_slug: slug.to_owned(),
        locale: Locale::ensure(lang.as_deref()),
        page,
        page_size,
        filters,
        sort: ListingSort::parse(sort.as_deref()),
    }
}

/// `GET /api/categories` - root categories by name.
pub async fn top_categories<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().top_categories(query.limit()).await?))
}

/// `GET /api/categories/{slug}/products` - grouped, filtered listing.
pub async fn category_products<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Path(slug): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ListingPage>> {
    let request = listing_request(&slug, raw.as_deref());
    Ok(Json(state.catalog().list_by_category(&request).await?))
}

/// `GET /api/categories/{slug}/facets`
pub async fn category_facets<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryFacets>> {
    Ok(Json(state.catalog().category_facets(&slug).await?))
}

/// `GET /api/categories/{slug}/children`
pub async fn category_children<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().child_categories(&slug).await?))
}

/// `GET /api/products/latest` - home page feed.
pub async fn latest_products<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<Vec<Card>>> {
    let locale = Locale::ensure(query.lang.as_deref());
    Ok(Json(
        state.catalog().latest_products(locale, query.limit()).await?,
    ))
}

/// `GET /api/products/{slug}`
pub async fn product_detail<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Path(slug): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<ProductDetail>> {
    let locale = Locale::ensure(query.lang.as_deref());
    state
        .catalog()
        .product_by_slug(&slug, locale)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))
}
