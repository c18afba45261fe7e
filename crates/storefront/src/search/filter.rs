//! Filter and sort translation for the product index.
//!
//! Filters are built as a structured conjunction ([`FilterExpr`]) and only
//! rendered to the index's textual filter syntax at the edge, so another
//! backend (or the in-memory index used in tests) can evaluate the same
//! clauses directly.

use std::fmt;

use rust_decimal::Decimal;

use super::SearchFilters;

/// Index attribute names used in filters, sorts and facets.
pub mod attr {
    pub const CATEGORY: &str = "category";
    pub const SUBCATEGORY: &str = "subcategory";
    pub const BRAND: &str = "brand";
    pub const IN_STOCK: &str = "inStock";
    pub const PRICE: &str = "price";
    pub const RATING: &str = "rating";
    pub const CREATED_AT: &str = "createdAt";
}

/// A scalar on the right-hand side of an equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Str(String),
    Bool(bool),
}

/// One per-field predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Eq {
        field: &'static str,
        value: FilterValue,
    },
    In {
        field: &'static str,
        values: Vec<String>,
    },
    Gte {
        field: &'static str,
        value: Decimal,
    },
    Lte {
        field: &'static str,
        value: Decimal,
    },
}

/// A conjunction of independent clauses. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpr {
    clauses: Vec<Clause>,
}

impl FilterExpr {
    /// One clause per active filter, in a fixed field order.
    #[must_use]
    pub fn from_filters(filters: &SearchFilters) -> Self {
        let mut clauses = Vec::new();

        if let Some(category) = non_blank(filters.category.as_deref()) {
            clauses.push(Clause::Eq {
                field: attr::CATEGORY,
                value: FilterValue::Str(category.to_owned()),
            });
        }
        if let Some(subcategory) = non_blank(filters.subcategory.as_deref()) {
            clauses.push(Clause::Eq {
                field: attr::SUBCATEGORY,
                value: FilterValue::Str(subcategory.to_owned()),
            });
        }
        if !filters.brands.is_empty() {
            clauses.push(Clause::In {
                field: attr::BRAND,
                values: filters.brands.clone(),
            });
        }
        if filters.in_stock {
            clauses.push(Clause::Eq {
                field: attr::IN_STOCK,
                value: FilterValue::Bool(true),
            });
        }
        if let Some(min) = filters.price_min {
            clauses.push(Clause::Gte {
                field: attr::PRICE,
                value: min,
            });
        }
        if let Some(max) = filters.price_max {
            clauses.push(Clause::Lte {
                field: attr::PRICE,
                value: max,
            });
        }

        Self { clauses }
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The filter string for the index, or `None` when nothing is filtered.
    #[must_use]
    pub fn to_filter_string(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Write a double-quoted string literal, escaping `"` and `\`.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq {
                field,
                value: FilterValue::Str(s),
            } => {
                write!(f, "{field} = ")?;
                write_quoted(f, s)
            }
            Self::Eq {
                field,
                value: FilterValue::Bool(b),
            } => write!(f, "{field} = {b}"),
            Self::In { field, values } => {
                write!(f, "{field} IN [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, v)?;
                }
                f.write_str("]")
            }
            Self::Gte { field, value } => write!(f, "{field} >= {}", value.normalize()),
            Self::Lte { field, value } => write!(f, "{field} <= {}", value.normalize()),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

/// Search sort keys. Exactly one is active per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchSort {
    PriceAsc,
    PriceDesc,
    RatingDesc,
    #[default]
    Newest,
}

/// Direction of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl SearchSort {
    /// Parse a sort name; unknown or missing names mean [`SearchSort::Newest`].
    #[must_use]
    pub fn parse(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            Some("priceAsc") => Self::PriceAsc,
            Some("priceDesc") => Self::PriceDesc,
            Some("ratingDesc") => Self::RatingDesc,
            _ => Self::Newest,
        }
    }

    /// The sorted attribute and direction.
    #[must_use]
    pub const fn key(self) -> (&'static str, Direction) {
        match self {
            Self::PriceAsc => (attr::PRICE, Direction::Asc),
            Self::PriceDesc => (attr::PRICE, Direction::Desc),
            Self::RatingDesc => (attr::RATING, Direction::Desc),
            Self::Newest => (attr::CREATED_AT, Direction::Desc),
        }
    }

    /// The `attribute:direction` sort expression.
    #[must_use]
    pub const fn as_sort_expr(self) -> &'static str {
        match self {
            Self::PriceAsc => "price:asc",
            Self::PriceDesc => "price:desc",
            Self::RatingDesc => "rating:desc",
            Self::Newest => "createdAt:desc",
        }
    }
}
