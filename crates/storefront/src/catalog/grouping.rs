//! Variant grouping: collapse product rows to one representative per group.

use std::collections::HashSet;

use brico_core::{GroupId, Product, ProductId};

/// Identity of a displayable unit in a listing.
///
/// Ungrouped products form singleton groups keyed by their own id. The two
/// id spaces are kept apart so group 7 never merges with ungrouped product 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Group(GroupId),
    Single(ProductId),
}

impl GroupKey {
    #[must_use]
    pub fn of(product: &Product) -> Self {
        product
            .group_id
            .map_or(Self::Single(product.id), Self::Group)
    }
}

/// Stable sort into grouping order:
/// `(group_id ASC NULLS LAST, group_order ASC NULLS LAST, id ASC)`.
///
/// The store already returns listing rows in this order.
pub fn sort_for_grouping(rows: &mut [Product]) {
    rows.sort_by_key(|p| {
        (
            p.group_id.is_none(),
            p.group_id,
            p.group_order.is_none(),
            p.group_order,
            p.id,
        )
    });
}

/// Keep the first row seen for each [`GroupKey`], in first-seen order.
///
/// Input must already be in grouping order (see [`sort_for_grouping`]);
/// "first seen" is then the variant with the lowest `group_order`. If the
/// natural representative was filtered out, whichever member remains first
/// stands in for the group.
#[must_use]
pub fn group_variants(rows: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|p| seen.insert(GroupKey::of(p)))
        .collect()
}
