//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                             - Liveness
//! GET    /health/ready                       - Database and index reachable
//!
//! # Catalog
//! GET    /api/categories                     - Root categories
//! GET    /api/categories/{slug}/products     - Grouped, filtered listing
//! GET    /api/categories/{slug}/facets       - Brands and price range
//! GET    /api/categories/{slug}/children     - Direct subcategories
//! GET    /api/products/latest                - Newest products
//! GET    /api/products/{slug}                - Product page
//!
//! # Search
//! POST   /api/search                         - Full-text search with facets
//! GET    /api/suggest                        - Autocomplete
//!
//! # Index maintenance (bearer token)
//! POST   /api/reindex                        - Full rebuild (202, or 200 with ?wait=true)
//! POST   /api/index/products/{id}            - Refresh one document
//! DELETE /api/index/products/{id}            - Remove one document
//! ```

pub mod catalog;
pub mod reindex;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::catalog::CatalogStore;
use crate::search::SearchBackend;
use crate::state::AppState;

/// Create the `/api` router.
pub fn api_routes<S, B>() -> Router<AppState<S, B>>
where
    S: CatalogStore + Clone + 'static,
    B: SearchBackend + Clone + 'static,
{
    Router::new()
        .route("/categories", get(catalog::top_categories::<S, B>))
        .route(
            "/categories/{slug}/products",
            get(catalog::category_products::<S, B>),
        )
        .route(
            "/categories/{slug}/facets",
            get(catalog::category_facets::<S, B>),
        )
        .route(
            "/categories/{slug}/children",
            get(catalog::category_children::<S, B>),
        )
        .route("/products/latest", get(catalog::latest_products::<S, B>))
        .route("/products/{slug}", get(catalog::product_detail::<S, B>))
        .route("/search", post(search::search::<S, B>))
        .route("/suggest", get(search::suggest::<S, B>))
        .route("/reindex", post(reindex::reindex::<S, B>))
        .route(
            "/index/products/{id}",
            post(reindex::upsert_product::<S, B>).delete(reindex::delete_product::<S, B>),
        )
}
