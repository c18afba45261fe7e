//! Search index document shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One flattened record in the search index.
///
/// Derived from the relational catalog and never authoritative. Field names
/// are the index's attribute names; prices are emitted as JSON numbers so the
/// index can filter and sort on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    /// Primary key: the relational id in string form.
    pub id: String,
    pub slug: Option<String>,
    /// Post-localization display title.
    pub title: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    /// Parent category slug, or the product's own category when it is a root.
    pub category: String,
    /// The product's own category slug when it has a parent.
    pub subcategory: Option<String>,
    /// Price including VAT (rounded to cents), or the base price when no rate is set.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_ex_vat: Decimal,
    pub in_stock: bool,
    pub image_url: Option<String>,
    /// ISO 8601 timestamps.
    pub created_at: String,
    pub updated_at: String,
}

impl SearchDocument {
    /// Primary key attribute name.
    pub const PRIMARY_KEY: &'static str = "id";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_with_numeric_prices() {
        let doc = SearchDocument {
            id: "7".to_owned(),
            slug: Some("sierra-7".to_owned()),
            title: "Sierra".to_owned(),
            description: None,
            brand: Some("Bellota".to_owned()),
            category: "herramientas".to_owned(),
            subcategory: None,
            price: Decimal::new(726, 1),
            price_ex_vat: Decimal::new(60, 0),
            in_stock: true,
            image_url: None,
            created_at: "2024-01-01T00:00:00+00:00".to_owned(),
            updated_at: "2024-01-02T00:00:00+00:00".to_owned(),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["priceExVat"], serde_json::json!(60.0));
        assert_eq!(value["price"], serde_json::json!(72.6));
        assert_eq!(value["inStock"], serde_json::json!(true));
        assert!(value["subcategory"].is_null());
    }
}
