//! Search and autocomplete handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::search::{SearchBackend, SearchFilters, SearchRequest, SearchResults, SearchSort, Suggestions};
use crate::state::AppState;

/// JSON body of `POST /api/search`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchBody {
    pub q: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort: Option<String>,
    pub filters: FiltersBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FiltersBody {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Vec<String>,
    pub in_stock: bool,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

impl From<SearchBody> for SearchRequest {
    fn from(body: SearchBody) -> Self {
        let filters = body.filters;
        Self {
            text: body.q,
            page: body.page,
            page_size: body.page_size,
            sort: SearchSort::parse(body.sort.as_deref()),
            filters: SearchFilters {
                category: filters.category,
                subcategory: filters.subcategory,
                brands: filters.brand,
                in_stock: filters.in_stock,
                price_min: filters.price_min,
                price_max: filters.price_max,
            },
        }
    }
}

/// `POST /api/search`
pub async fn search<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResults>> {
    let request = SearchRequest::from(body);
    Ok(Json(state.search().search(&request).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<String>,
}

impl SuggestQuery {
    /// An unparseable limit falls back to the default.
    #[must_use]
    pub fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

/// `GET /api/suggest?q=..&limit=..`
pub async fn suggest<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Suggestions>> {
    Ok(Json(state.search().suggest(&query.q, query.limit()).await?))
}
