//! Category listing: filter, group, sort, paginate.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{Span, instrument};

use brico_core::{Card, CategoryId, Locale, Product, Slug};

use super::grouping::{group_variants, sort_for_grouping};
use super::{Catalog, CatalogError, CatalogStore, ListingScope};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// Largest page size served; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 60;

const DEFAULT_LATEST_LIMIT: u32 = 12;

/// Clamp a 1-based page number to `>= 1`. Missing means the first page.
#[must_use]
pub fn clamp_page(page: Option<i64>) -> u32 {
    let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
    u32::try_from(page).unwrap_or(1)
}

/// Clamp a page size to `[1, MAX_PAGE_SIZE]`. Missing means [`DEFAULT_PAGE_SIZE`].
#[must_use]
pub fn clamp_page_size(size: Option<i64>) -> u32 {
    size.map_or(DEFAULT_PAGE_SIZE, |s| {
        u32::try_from(s.clamp(1, i64::from(MAX_PAGE_SIZE))).unwrap_or(DEFAULT_PAGE_SIZE)
    })
}

/// Listing sort keys. Unknown keys fall back to [`ListingSort::Newest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingSort {
    PriceAsc,
    PriceDesc,
    /// By slug, as a stand-in for display name.
    NameAsc,
    NameDesc,
    /// Highest id first; ids are assigned in creation order.
    #[default]
    Newest,
}

impl ListingSort {
    #[must_use]
    pub fn parse(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            Some("priceAsc") => Self::PriceAsc,
            Some("priceDesc") => Self::PriceDesc,
            Some("nameAsc") => Self::NameAsc,
            Some("nameDesc") => Self::NameDesc,
            _ => Self::Newest,
        }
    }

    /// Compare two representatives. Name sorts compare slugs byte-wise,
    /// treating a missing slug as empty.
    #[must_use]
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        fn slug(p: &Product) -> &str {
            p.slug.as_ref().map_or("", Slug::as_str)
        }

        match self {
            Self::PriceAsc => a.price_ex_vat.cmp(&b.price_ex_vat),
            Self::PriceDesc => b.price_ex_vat.cmp(&a.price_ex_vat),
            Self::NameAsc => slug(a).cmp(slug(b)),
            Self::NameDesc => slug(b).cmp(slug(a)),
            Self::Newest => b.id.cmp(&a.id),
        }
    }
}

/// Optional listing filters. A field left at its default does not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilters {
    /// Exact brand names; empty means any brand.
    #[serde(default)]
    pub brands: Vec<String>,
    /// Only products with stock > 0 when set.
    #[serde(default)]
    pub in_stock: bool,
    /// Inclusive bounds on the price excluding tax.
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

impl ListingFilters {
    /// Whether a product passes every active filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let brand_ok = self.brands.is_empty()
            || product
                .brand
                .as_ref()
                .is_some_and(|b| self.brands.iter().any(|f| f == b));
        let stock_ok = !self.in_stock || product.in_stock();
        let min_ok = self.price_min.is_none_or(|min| product.price_ex_vat >= min);
        let max_ok = self.price_max.is_none_or(|max| product.price_ex_vat <= max);

        brand_ok && stock_ok && min_ok && max_ok
    }
}

/// A category listing request. Page values are clamped, never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub category_slug: String,
    pub locale: Locale,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub filters: ListingFilters,
    pub sort: ListingSort,
}

impl ListingRequest {
    /// First page of a category with default size, no filters, newest first.
    #[must_use]
    pub fn new(category_slug: impl Into<String>, locale: Locale) -> Self {
        Self {
            category_slug: category_slug.into(),
            locale,
            page: None,
            page_size: None,
            filters: ListingFilters::default(),
            sort: ListingSort::default(),
        }
    }
}

/// One page of grouped listing cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    /// Number of groups matching the filters, across all pages.
    pub total: usize,
    pub items: Vec<Card>,
    pub page: u32,
    pub page_size: u32,
}

impl ListingPage {
    const fn empty(page: u32, page_size: u32) -> Self {
        Self {
            total: 0,
            items: Vec::new(),
            page,
            page_size,
        }
    }
}

impl<S: CatalogStore> Catalog<'_, S> {
    /// List a category and its descendants as grouped, sorted, paginated cards.
    ///
    /// All matching rows are fetched before grouping, because a group's
    /// members may be spread over any number of pages of raw rows. `total`
    /// counts groups. Card prices exclude tax.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails. An unknown
    /// category is an empty page.
    #[instrument(
        skip(self, request),
        fields(category_slug = %request.category_slug, total = tracing::field::Empty)
    )]
    pub async fn list_by_category(
        &self,
        request: &ListingRequest,
    ) -> Result<ListingPage, CatalogError> {
        let page = clamp_page(request.page);
        let page_size = clamp_page_size(request.page_size);

        let Some(category) = self.store.category_by_slug(&request.category_slug).await? else {
            Span::current().record("total", 0);
            return Ok(ListingPage::empty(page, page_size));
        };

        let categories: Vec<CategoryId> =
            self.descendant_ids(category.id).await?.into_iter().collect();
        let locales = self.locales(request.locale);

        let mut rows = self
            .store
            .listing_rows(ListingScope {
                categories: &categories,
                filters: &request.filters,
                locales: &locales,
            })
            .await?;

        sort_for_grouping(&mut rows);
        let mut groups = group_variants(rows);
        groups.sort_by(|a, b| request.sort.compare(a, b));

        let total = groups.len();
        Span::current().record("total", total);

        let offset = (page as usize - 1).saturating_mul(page_size as usize);
        let items = groups
            .iter()
            .skip(offset)
            .take(page_size as usize)
            .map(|p| self.card(p, request.locale))
            .collect();

        Ok(ListingPage {
            total,
            items,
            page,
            page_size,
        })
    }

    /// Newest products first, ungrouped. `limit` defaults to 12 and is
    /// clamped to `[1, MAX_PAGE_SIZE]`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn latest_products(
        &self,
        locale: Locale,
        limit: Option<u32>,
    ) -> Result<Vec<Card>, CatalogError> {
        let limit = limit.unwrap_or(DEFAULT_LATEST_LIMIT).clamp(1, MAX_PAGE_SIZE);
        let products = self
            .store
            .latest_products(limit, &self.locales(locale))
            .await?;

        Ok(products.iter().map(|p| self.card(p, locale)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOptions;
    use crate::test_support::{FailingCatalog, InMemoryCatalog, category, product};
    use brico_core::{GroupId, ProductId};

    fn priced(id: i32, cat: i32, price: i64) -> Product {
        let mut p = product(id);
        p.category_id = Some(CategoryId::new(cat));
        p.price_ex_vat = Decimal::new(price, 0);
        p.slug = Some(Slug::from_trusted(format!("p-{id:02}")));
        p
    }

    fn seeded() -> InMemoryCatalog {
        let store = InMemoryCatalog::new();
        store.add_category(category(1, "herramientas", None));
        store.add_category(category(2, "taladros", Some(1)));
        store.add_category(category(3, "jardin", None));
        store
    }

    #[test]
    fn test_clamp_page_and_size() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(-4)), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(7)), 7);
        assert_eq!(clamp_page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(500)), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_sort_parse_defaults_to_newest() {
        assert_eq!(ListingSort::parse(Some("priceAsc")), ListingSort::PriceAsc);
        assert_eq!(ListingSort::parse(Some("nameDesc")), ListingSort::NameDesc);
        assert_eq!(ListingSort::parse(Some("bogus")), ListingSort::Newest);
        assert_eq!(ListingSort::parse(None), ListingSort::Newest);
    }

    #[test]
    fn test_name_sort_treats_missing_slug_as_empty() {
        let mut a = product(1);
        a.slug = None;
        let mut b = product(2);
        b.slug = Some(Slug::from_trusted("a"));
        assert_eq!(ListingSort::NameAsc.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_filters_default_match_everything() {
        let p = product(1);
        assert!(ListingFilters::default().matches(&p));
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty_page() {
        let store = seeded();
        let catalog = Catalog::new(&store, CatalogOptions::default());
        let mut request = ListingRequest::new("nope", Locale::Es);
        request.page = Some(3);

        let page = catalog.list_by_category(&request).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.page, 3);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_listing_includes_descendants_and_excludes_others() {
        let store = seeded();
        store.add_product(priced(1, 1, 10));
        store.add_product(priced(2, 2, 20));
        store.add_product(priced(3, 3, 30));
        let mut orphan = priced(4, 1, 40);
        orphan.category_id = None;
        store.add_product(orphan);

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let page = catalog
            .list_by_category(&ListingRequest::new("herramientas", Locale::Es))
            .await
            .unwrap();

        let ids: Vec<_> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(1)]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_total_counts_groups_and_pages_slice_groups() {
        let store = seeded();
        for id in 1..=6 {
            let mut p = priced(id, 2, i64::from(id));
            // Products 1-3 are variants of one item.
            if id <= 3 {
                p.group_id = Some(GroupId::new(100));
                p.group_order = Some(id);
            }
            store.add_product(p);
        }

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let mut request = ListingRequest::new("herramientas", Locale::Es);
        request.sort = ListingSort::PriceAsc;
        request.page_size = Some(2);

        let first = catalog.list_by_category(&request).await.unwrap();
        assert_eq!(first.total, 4);
        let ids: Vec<_> = first.items.iter().map(|c| c.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 4]);

        request.page = Some(2);
        let second = catalog.list_by_category(&request).await.unwrap();
        let ids: Vec<_> = second.items.iter().map(|c| c.id.as_i32()).collect();
        assert_eq!(ids, vec![5, 6]);

        request.page = Some(3);
        let past_end = catalog.list_by_category(&request).await.unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 4);
    }

    #[tokio::test]
    async fn test_sort_applies_to_representatives() {
        let store = seeded();
        let mut cheap_variant = priced(1, 1, 5);
        cheap_variant.group_id = Some(GroupId::new(9));
        cheap_variant.group_order = Some(2);
        let mut representative = priced(2, 1, 50);
        representative.group_id = Some(GroupId::new(9));
        representative.group_order = Some(1);
        store.add_product(cheap_variant);
        store.add_product(representative);
        store.add_product(priced(3, 1, 20));

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let mut request = ListingRequest::new("herramientas", Locale::Es);
        request.sort = ListingSort::PriceAsc;

        let page = catalog.list_by_category(&request).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|c| c.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_filters_restrict() {
        let store = seeded();
        let mut a = priced(1, 1, 5);
        a.brand = Some("Bosch".to_owned());
        a.stock = Some(3);
        let mut b = priced(2, 1, 15);
        b.brand = Some("Makita".to_owned());
        b.stock = Some(0);
        let mut c = priced(3, 1, 25);
        c.brand = Some("Bosch".to_owned());
        c.stock = Some(1);
        store.add_product(a);
        store.add_product(b);
        store.add_product(c);

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let mut request = ListingRequest::new("herramientas", Locale::Es);
        request.filters = ListingFilters {
            brands: vec!["Bosch".to_owned()],
            in_stock: true,
            price_min: Some(Decimal::new(10, 0)),
            price_max: Some(Decimal::new(30, 0)),
        };

        let page = catalog.list_by_category(&request).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|c| c.id.as_i32()).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let catalog = Catalog::new(&FailingCatalog, CatalogOptions::default());
        let result = catalog
            .list_by_category(&ListingRequest::new("herramientas", Locale::Es))
            .await;
        assert!(matches!(result, Err(CatalogError::Repository(_))));
    }

    #[tokio::test]
    async fn test_latest_products_newest_first() {
        let store = seeded();
        for id in 1..=4 {
            store.add_product(priced(id, 1, 10));
        }
        let catalog = Catalog::new(&store, CatalogOptions::default());
        let cards = catalog.latest_products(Locale::Es, Some(2)).await.unwrap();
        let ids: Vec<_> = cards.iter().map(|c| c.id.as_i32()).collect();
        assert_eq!(ids, vec![4, 3]);
    }
}
