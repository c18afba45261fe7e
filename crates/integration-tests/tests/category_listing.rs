//! Integration tests for category browsing.
//!
//! A small hardware catalog is browsed through the public `Catalog`
//! service: tree expansion, variant grouping, filtering, sorting and
//! pagination working together.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use brico_core::{CategoryId, Locale, ProductId};
use brico_integration_tests::{in_group, listed_product};
use brico_storefront::catalog::{
    Catalog, CatalogError, CatalogOptions, ListingFilters, ListingPage, ListingRequest,
    ListingSort,
};
use brico_storefront::test_support::{FailingCatalog, InMemoryCatalog, category};
use rust_decimal::Decimal;

// =============================================================================
// Fixture
// =============================================================================

/// `herramientas` (1) has three descendants: `taladros` (2), `sierras` (3)
/// and `sierras-de-calar` (4, under 3). `jardin` (5) is a separate root.
///
/// Products 4 and 5 are variants of one item; 4 is the representative but
/// out of stock.
fn hardware_store() -> InMemoryCatalog {
    let store = InMemoryCatalog::new();
    store.add_category(category(1, "herramientas", None));
    store.add_category(category(2, "taladros", Some(1)));
    store.add_category(category(3, "sierras", Some(1)));
    store.add_category(category(4, "sierras-de-calar", Some(3)));
    store.add_category(category(5, "jardin", None));

    let mut bosch = listed_product(2, 2, 12, 1);
    bosch.brand = Some("Bosch".to_owned());
    let mut makita = listed_product(9, 2, 50, 1);
    makita.brand = Some("Makita".to_owned());

    for p in [
        listed_product(1, 2, 5, 3),
        bosch,
        listed_product(3, 3, 30, 0),
        in_group(listed_product(4, 3, 15, 0), 7, 0),
        in_group(listed_product(5, 3, 18, 4), 7, 1),
        listed_product(6, 4, 25, 5),
        listed_product(7, 4, 11, 1),
        listed_product(8, 1, 40, 2),
        makita,
        listed_product(10, 5, 20, 9),
    ] {
        store.add_product(p);
    }
    store
}

fn request(slug: &str) -> ListingRequest {
    ListingRequest::new(slug, Locale::Es)
}

fn ids(page: &ListingPage) -> Vec<i32> {
    page.items.iter().map(|c| c.id.as_i32()).collect()
}

async fn list(store: &InMemoryCatalog, request: &ListingRequest) -> ListingPage {
    Catalog::new(store, CatalogOptions::default())
        .list_by_category(request)
        .await
        .unwrap()
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[tokio::test]
async fn test_in_stock_from_ten_by_price_first_page() {
    let store = hardware_store();
    let mut req = request("herramientas");
    req.filters.in_stock = true;
    req.filters.price_min = Some(Decimal::new(10, 0));
    req.sort = ListingSort::PriceAsc;
    req.page = Some(1);
    req.page_size = Some(5);

    let page = list(&store, &req).await;

    assert_eq!(page.total, 6);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 5);
    assert_eq!(ids(&page), vec![7, 2, 5, 6, 8]);

    let prices: Vec<Decimal> = page.items.iter().map(|c| c.price_ex_vat).collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    assert!(prices.iter().all(|p| *p >= Decimal::new(10, 0)));
    assert!(page.items.iter().all(|c| c.in_stock));

    req.page = Some(2);
    let rest = list(&store, &req).await;
    assert_eq!(ids(&rest), vec![9]);
    assert_eq!(rest.total, 6);
}

#[tokio::test]
async fn test_group_represented_once_by_lowest_order() {
    let store = hardware_store();
    let mut req = request("sierras");
    req.page_size = Some(60);

    let page = list(&store, &req).await;

    // 3, group {4, 5} and 6, 7 from the nested subcategory
    assert_eq!(page.total, 4);
    let listed: BTreeSet<i32> = ids(&page).into_iter().collect();
    assert!(listed.contains(&4));
    assert!(!listed.contains(&5));
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_total_counts_groups_and_pages_never_overflow() {
    let store = hardware_store();
    for size in 1..=7 {
        let mut req = request("herramientas");
        req.page_size = Some(size);

        let mut seen = Vec::new();
        for page in 1..=10 {
            req.page = Some(page);
            let result = list(&store, &req).await;
            assert_eq!(result.total, 8, "9 rows in 8 groups");
            assert!(result.items.len() <= usize::try_from(size).unwrap());
            seen.extend(ids(&result));
        }

        let distinct: BTreeSet<i32> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 8, "every group appears exactly once across pages");
        assert_eq!(distinct.len(), 8);
    }
}

#[tokio::test]
async fn test_dropping_a_filter_never_shrinks_results() {
    let store = hardware_store();
    let restrictive = ListingFilters {
        brands: vec!["Bosch".to_owned()],
        in_stock: true,
        price_min: Some(Decimal::new(10, 0)),
        price_max: Some(Decimal::new(30, 0)),
    };

    let relaxations: [fn(&mut ListingFilters); 4] = [
        |f| f.brands.clear(),
        |f| f.in_stock = false,
        |f| f.price_min = None,
        |f| f.price_max = None,
    ];

    let matching = |filters: ListingFilters| {
        let store = store.clone();
        async move {
            let mut req = request("herramientas");
            req.page_size = Some(60);
            req.filters = filters;
            ids(&list(&store, &req).await)
                .into_iter()
                .collect::<BTreeSet<i32>>()
        }
    };

    let narrow = matching(restrictive.clone()).await;
    assert_eq!(narrow, BTreeSet::from([2]));

    for relax in relaxations {
        let mut wider = restrictive.clone();
        relax(&mut wider);
        assert!(matching(wider).await.is_superset(&narrow));
    }
    assert_eq!(matching(ListingFilters::default()).await.len(), 8);
}

#[tokio::test]
async fn test_descendants_contain_self_and_children_subtrees() {
    let store = hardware_store();
    let catalog = Catalog::new(&store, CatalogOptions::default());

    let all = catalog.descendant_ids(CategoryId::new(1)).await.unwrap();
    let saws = catalog.descendant_ids(CategoryId::new(3)).await.unwrap();
    let drills = catalog.descendant_ids(CategoryId::new(2)).await.unwrap();

    assert!(all.contains(&CategoryId::new(1)));
    assert!(all.is_superset(&saws));
    assert!(all.is_superset(&drills));
    assert_eq!(saws, BTreeSet::from([CategoryId::new(3), CategoryId::new(4)]));
    assert!(!all.contains(&CategoryId::new(5)));

    let unknown = catalog.descendant_ids(CategoryId::new(404)).await.unwrap();
    assert_eq!(unknown, BTreeSet::from([CategoryId::new(404)]));
}

// =============================================================================
// Edges
// =============================================================================

#[tokio::test]
async fn test_unknown_category_and_out_of_range_paging() {
    let store = hardware_store();

    let missing = list(&store, &request("no-existe")).await;
    assert_eq!(missing.total, 0);
    assert!(missing.items.is_empty());

    let mut req = request("herramientas");
    req.page = Some(-3);
    req.page_size = Some(10_000);
    let page = list(&store, &req).await;
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 60);
    assert_eq!(page.items.len(), 8);
}

#[tokio::test]
async fn test_store_outage_is_an_error_not_an_empty_page() {
    let result = Catalog::new(&FailingCatalog, CatalogOptions::default())
        .list_by_category(&request("herramientas"))
        .await;
    assert!(matches!(result, Err(CatalogError::Repository(_))));
}

#[tokio::test]
async fn test_facets_span_the_subtree() {
    let store = hardware_store();
    let facets = Catalog::new(&store, CatalogOptions::default())
        .category_facets("herramientas")
        .await
        .unwrap();

    assert_eq!(facets.brands, vec!["Bosch".to_owned(), "Makita".to_owned()]);
    assert_eq!(facets.price_min, Some(Decimal::new(5, 0)));
    assert_eq!(facets.price_max, Some(Decimal::new(50, 0)));
    assert_eq!(facets.total_count, 9);
    assert_eq!(facets.in_stock_count, 7);
}

#[tokio::test]
async fn test_product_page_lists_group_variants() {
    let store = hardware_store();
    let detail = Catalog::new(&store, CatalogOptions::default())
        .product_by_slug("producto-5", Locale::Es)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(detail.id, ProductId::new(5));
    let variants: Vec<ProductId> = detail.variants.iter().map(|v| v.id).collect();
    assert_eq!(variants, vec![ProductId::new(4), ProductId::new(5)]);
}
