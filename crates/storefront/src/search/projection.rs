//! Relational product → search document.
//!
//! This is the only mapping from catalog records to index documents; both
//! the bulk reindex and the upsert-on-write path go through it.

use chrono::SecondsFormat;

use brico_core::{
    CategoryPlacement, IndexableProduct, Locale, SearchDocument, price_inc_vat,
};

/// Project a product into its index document.
///
/// Total and deterministic: missing optional data becomes `None` or a
/// default (`"general"` category, base name or `"Producto"` title), never
/// an error. `cdn_cloud_name` selects CDN delivery URLs for migrated images.
#[must_use]
pub fn to_search_document(
    item: &IndexableProduct,
    locale: Locale,
    fallback: Locale,
    cdn_cloud_name: Option<&str>,
) -> SearchDocument {
    let product = &item.product;
    let (category, subcategory) = CategoryPlacement::index_slugs(item.category.as_ref());

    SearchDocument {
        id: product.id.to_string(),
        slug: product.slug.as_ref().map(ToString::to_string),
        title: product.display_name(locale, fallback),
        description: product.display_description(locale, fallback),
        brand: product
            .brand
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_owned),
        category,
        subcategory,
        price: price_inc_vat(product.price_ex_vat, product.vat_rate),
        price_ex_vat: product.price_ex_vat,
        in_stock: product.in_stock(),
        image_url: product
            .primary_image()
            .map(|img| img.display_url(cdn_cloud_name)),
        created_at: product.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        updated_at: product.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::test_support::product;
    use brico_core::{ImageId, ProductImage, Slug};

    fn indexable(placement: Option<CategoryPlacement>) -> IndexableProduct {
        let mut p = product(3);
        p.slug = Some(Slug::from_trusted("llave-3"));
        p.price_ex_vat = Decimal::new(60, 0);
        p.vat_rate = Some(Decimal::new(21, 0));
        p.stock = Some(4);
        p.brand = Some(" Irimo ".to_owned());
        p.images = vec![ProductImage::new(ImageId::new(1), "https://img/llave.jpg", Some(0))];
        IndexableProduct {
            product: p,
            category: placement,
        }
    }

    #[test]
    fn test_projection_maps_every_field() {
        let item = indexable(Some(CategoryPlacement {
            slug: Slug::from_trusted("llaves"),
            parent_slug: Some(Slug::from_trusted("herramientas")),
        }));

        let doc = to_search_document(&item, Locale::Es, Locale::Es, None);
        assert_eq!(doc.id, "3");
        assert_eq!(doc.slug.as_deref(), Some("llave-3"));
        assert_eq!(doc.title, "Producto base 3");
        assert_eq!(doc.brand.as_deref(), Some("Irimo"));
        assert_eq!(doc.category, "herramientas");
        assert_eq!(doc.subcategory.as_deref(), Some("llaves"));
        assert_eq!(doc.price, Decimal::new(726, 1));
        assert_eq!(doc.price_ex_vat, Decimal::new(60, 0));
        assert!(doc.in_stock);
        assert_eq!(doc.image_url.as_deref(), Some("https://img/llave.jpg"));
        assert_eq!(doc.created_at, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn test_projection_price_examples() {
        let mut item = indexable(None);
        item.product.price_ex_vat = Decimal::new(20, 0);
        assert_eq!(
            to_search_document(&item, Locale::Es, Locale::Es, None).price,
            Decimal::new(242, 1)
        );

        item.product.vat_rate = None;
        assert_eq!(
            to_search_document(&item, Locale::Es, Locale::Es, None).price,
            Decimal::new(20, 0)
        );
    }

    #[test]
    fn test_projection_is_total_for_bare_product() {
        let mut p = product(9);
        p.name = None;
        let item = IndexableProduct {
            product: p,
            category: None,
        };

        let doc = to_search_document(&item, Locale::En, Locale::Es, Some("brico"));
        assert_eq!(doc.title, "Producto");
        assert_eq!(doc.category, "general");
        assert_eq!(doc.subcategory, None);
        assert_eq!(doc.slug, None);
        assert_eq!(doc.image_url, None);
        assert!(!doc.in_stock);
        assert_eq!(doc, to_search_document(&item, Locale::En, Locale::Es, Some("brico")));
    }
}
