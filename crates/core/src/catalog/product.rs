//! Product records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CategoryPlacement;
use crate::types::{CategoryId, GroupId, ImageId, Locale, ProductId, Slug};

/// Name shown when a product has neither localized text nor a base name.
pub const DEFAULT_DISPLAY_NAME: &str = "Producto";

/// A sellable item as stored in the relational catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// External reference code, stable across systems (ERP, supplier feeds).
    pub reference: Option<String>,
    /// Base display name in the catalog's source language.
    pub name: Option<String>,
    /// Localized name/description overrides, at most one per locale.
    pub texts: Vec<ProductText>,
    pub brand: Option<String>,
    /// Price excluding tax, never negative.
    pub price_ex_vat: Decimal,
    /// VAT percentage (e.g. `21` for 21%).
    pub vat_rate: Option<Decimal>,
    pub stock: Option<i32>,
    /// `None` (or a dangling reference) excludes the product from category browsing.
    pub category_id: Option<CategoryId>,
    /// Images ordered by ascending sort order.
    pub images: Vec<ProductImage>,
    /// Products sharing a group id are variants of one underlying item.
    pub group_id: Option<GroupId>,
    /// Position within the variant group; lowest is the representative.
    pub group_order: Option<i32>,
    /// Unique once assigned; `None` only until the slug backfill has run.
    pub slug: Option<Slug>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Localized text for an exact locale.
    #[must_use]
    pub fn text_for(&self, locale: Locale) -> Option<&ProductText> {
        self.texts.iter().find(|t| t.locale == locale)
    }

    /// Display name resolved as: requested locale, then fallback locale, then
    /// the base name, then [`DEFAULT_DISPLAY_NAME`].
    #[must_use]
    pub fn display_name(&self, locale: Locale, fallback: Locale) -> String {
        let localized = |l: Locale| {
            self.text_for(l)
                .and_then(|t| t.name.as_deref())
                .filter(|n| !n.trim().is_empty())
        };

        localized(locale)
            .or_else(|| localized(fallback))
            .or_else(|| self.name.as_deref().filter(|n| !n.trim().is_empty()))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_owned()
    }

    /// Localized description with the same locale fallback as the name.
    #[must_use]
    pub fn display_description(&self, locale: Locale, fallback: Locale) -> Option<String> {
        [locale, fallback]
            .into_iter()
            .filter_map(|l| self.text_for(l))
            .find_map(|t| t.description.clone().filter(|d| !d.trim().is_empty()))
    }

    /// The image with the lowest sort order (ties broken by id).
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().min_by_key(|img| (img.sort, img.id))
    }

    /// Whether any units are available.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.unwrap_or(0) > 0
    }
}

/// A localized name/description override for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductText {
    pub locale: Locale,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A product image.
///
/// `(product, url)` is unique: re-importing the same URL updates its sort
/// order instead of adding a duplicate. The CDN fields are filled in later by
/// the image migration job and may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub url: String,
    pub sort: i32,
    pub cdn_public_id: Option<String>,
    pub cdn_format: Option<String>,
    pub cdn_width: Option<i32>,
    pub cdn_height: Option<i32>,
    pub cdn_version: Option<i32>,
}

impl ProductImage {
    /// Sort order given to images imported without one, so they sort last.
    pub const UNSORTED: i32 = 9999;

    /// Create an image that has not been migrated to the CDN yet.
    #[must_use]
    pub fn new(id: ImageId, url: impl Into<String>, sort: Option<i32>) -> Self {
        Self {
            id,
            url: url.into(),
            sort: sort.unwrap_or(Self::UNSORTED),
            cdn_public_id: None,
            cdn_format: None,
            cdn_width: None,
            cdn_height: None,
            cdn_version: None,
        }
    }

    /// URL to deliver to clients.
    ///
    /// Uses the CDN (auto format, auto quality) once the image has been
    /// migrated and a cloud name is configured; the source URL otherwise.
    #[must_use]
    pub fn display_url(&self, cdn_cloud_name: Option<&str>) -> String {
        match (self.cdn_public_id.as_deref(), cdn_cloud_name) {
            (Some(public_id), Some(cloud)) if !cloud.is_empty() => format!(
                "https://res.cloudinary.com/{cloud}/image/upload/f_auto,q_auto/{public_id}"
            ),
            _ => self.url.clone(),
        }
    }
}

/// A product together with the category placement the search index needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexableProduct {
    pub product: Product,
    pub category: Option<CategoryPlacement>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::product;
    use super::*;

    fn text(locale: Locale, name: &str) -> ProductText {
        ProductText {
            locale,
            name: Some(name.to_owned()),
            description: None,
        }
    }

    #[test]
    fn test_display_name_prefers_requested_locale() {
        let mut p = product(1);
        p.texts = vec![text(Locale::Es, "Taladro"), text(Locale::En, "Drill")];
        assert_eq!(p.display_name(Locale::En, Locale::Es), "Drill");
    }

    #[test]
    fn test_display_name_falls_back_in_order() {
        let mut p = product(1);
        p.texts = vec![text(Locale::Es, "Taladro")];
        assert_eq!(p.display_name(Locale::De, Locale::Es), "Taladro");

        p.texts.clear();
        assert_eq!(p.display_name(Locale::De, Locale::Es), "Producto base 1");

        p.name = Some("  ".to_owned());
        assert_eq!(p.display_name(Locale::De, Locale::Es), DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn test_primary_image_lowest_sort() {
        let mut p = product(1);
        p.images = vec![
            ProductImage::new(ImageId::new(1), "https://img/late.jpg", None),
            ProductImage::new(ImageId::new(2), "https://img/first.jpg", Some(0)),
        ];
        assert_eq!(
            p.primary_image().map(|i| i.url.as_str()),
            Some("https://img/first.jpg")
        );
    }

    #[test]
    fn test_in_stock() {
        let mut p = product(1);
        assert!(!p.in_stock());
        p.stock = Some(0);
        assert!(!p.in_stock());
        p.stock = Some(3);
        assert!(p.in_stock());
    }

    #[test]
    fn test_display_url_uses_cdn_when_migrated() {
        let mut img = ProductImage::new(ImageId::new(1), "https://erp/img.jpg", Some(1));
        assert_eq!(img.display_url(Some("brico")), "https://erp/img.jpg");

        img.cdn_public_id = Some("products/abc".to_owned());
        assert_eq!(
            img.display_url(Some("brico")),
            "https://res.cloudinary.com/brico/image/upload/f_auto,q_auto/products/abc"
        );
        assert_eq!(img.display_url(None), "https://erp/img.jpg");
    }
}
