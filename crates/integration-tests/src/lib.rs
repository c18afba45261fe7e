//! Integration tests for the Brico storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p brico-integration-tests
//! ```
//!
//! The tests drive the catalog and search services end to end against the
//! in-memory store and index from `brico_storefront::test_support`, so no
//! database or search server is needed.
//!
//! # Test Categories
//!
//! - `category_listing` - tree expansion, grouping, filtering and paging
//! - `reindex` - index rebuild visibility and single-record writes

use brico_core::{CategoryId, GroupId, Product, Slug};
use rust_decimal::Decimal;

use brico_storefront::test_support::product;

/// A browsable product: slugged, placed in `category`, priced and stocked.
#[must_use]
pub fn listed_product(id: i32, category: i32, price: i64, stock: i32) -> Product {
    let mut p = product(id);
    p.category_id = Some(CategoryId::new(category));
    p.slug = Some(Slug::from_trusted(format!("producto-{id}")));
    p.price_ex_vat = Decimal::new(price, 0);
    p.stock = Some(stock);
    p
}

/// Put `p` in variant group `group` at position `order`.
#[must_use]
pub fn in_group(mut p: Product, group: i32, order: i32) -> Product {
    p.group_id = Some(GroupId::new(group));
    p.group_order = Some(order);
    p
}
