//! Filter options for a category page.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use brico_core::CategoryId;

use super::{Catalog, CatalogError, CatalogStore};

/// Aggregates over every product in a category subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFacets {
    /// Distinct brands, trimmed, non-empty, sorted.
    pub brands: Vec<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub in_stock_count: i64,
    pub total_count: i64,
}

impl CategoryFacets {
    fn normalize_brands(mut self) -> Self {
        self.brands = self
            .brands
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_owned)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self
    }
}

impl<S: CatalogStore> Catalog<'_, S> {
    /// Brand list, price range and stock counts for a category subtree.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails. An unknown
    /// category yields empty facets.
    #[instrument(skip(self))]
    pub async fn category_facets(&self, slug: &str) -> Result<CategoryFacets, CatalogError> {
        let Some(category) = self.store.category_by_slug(slug).await? else {
            return Ok(CategoryFacets::default());
        };

        let categories: Vec<CategoryId> =
            self.descendant_ids(category.id).await?.into_iter().collect();
        let facets = self.store.facets(&categories).await?;

        Ok(facets.normalize_brands())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOptions;
    use crate::test_support::{InMemoryCatalog, category, product};

    #[tokio::test]
    async fn test_facets_cover_subtree() {
        let store = InMemoryCatalog::new();
        store.add_category(category(1, "herramientas", None));
        store.add_category(category(2, "taladros", Some(1)));
        store.add_category(category(3, "jardin", None));

        let specs = [
            (1, 1, Some(" Bosch "), 12, Some(2)),
            (2, 2, Some("Makita"), 40, Some(0)),
            (3, 2, Some("Bosch"), 8, None),
            (4, 2, Some("  "), 20, Some(1)),
            (5, 3, Some("Stihl"), 300, Some(5)),
        ];
        for (id, cat, brand, price, stock) in specs {
            let mut p = product(id);
            p.category_id = Some(CategoryId::new(cat));
            p.brand = brand.map(str::to_owned);
            p.price_ex_vat = Decimal::new(price, 0);
            p.stock = stock;
            store.add_product(p);
        }

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let facets = catalog.category_facets("herramientas").await.unwrap();

        assert_eq!(facets.brands, vec!["Bosch".to_owned(), "Makita".to_owned()]);
        assert_eq!(facets.price_min, Some(Decimal::new(8, 0)));
        assert_eq!(facets.price_max, Some(Decimal::new(40, 0)));
        assert_eq!(facets.in_stock_count, 2);
        assert_eq!(facets.total_count, 4);
    }

    #[tokio::test]
    async fn test_unknown_category_has_empty_facets() {
        let store = InMemoryCatalog::new();
        let catalog = Catalog::new(&store, CatalogOptions::default());
        let facets = catalog.category_facets("nope").await.unwrap();
        assert_eq!(facets, CategoryFacets::default());
    }
}
