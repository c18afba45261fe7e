//! Product detail page data.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use brico_core::{Locale, Product, ProductId, Slug, price_inc_vat};

use super::{Catalog, CatalogError, CatalogStore};

/// A sibling in the product's variant group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub id: ProductId,
    pub slug: Option<Slug>,
    pub name: String,
    pub price_ex_vat: Decimal,
    pub in_stock: bool,
    /// The variant being viewed.
    pub current: bool,
}

/// Everything the product page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: ProductId,
    pub slug: Option<Slug>,
    pub reference: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price_ex_vat: Decimal,
    pub price_inc_vat: Decimal,
    pub vat_rate: Option<Decimal>,
    pub stock: Option<i32>,
    pub in_stock: bool,
    /// Delivery URLs, lowest sort order first.
    pub images: Vec<String>,
    /// Group members in `(group_order, id)` order; empty for ungrouped products.
    pub variants: Vec<VariantSummary>,
}

impl<S: CatalogStore> Catalog<'_, S> {
    /// Load a product page by slug. Unknown slug is `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn product_by_slug(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<ProductDetail>, CatalogError> {
        let locales = self.locales(locale);
        let Some(mut product) = self.store.product_by_slug(slug, &locales).await? else {
            return Ok(None);
        };

        let variants = match product.group_id {
            Some(group) => self
                .store
                .group_members(group, &locales)
                .await?
                .iter()
                .map(|member| self.variant_summary(member, &product, locale))
                .collect(),
            None => Vec::new(),
        };

        product.images.sort_by_key(|img| (img.sort, img.id));
        let fallback = self.options.fallback_locale;
        let cdn = self.options.cdn_cloud_name.as_deref();

        Ok(Some(ProductDetail {
            id: product.id,
            name: product.display_name(locale, fallback),
            description: product.display_description(locale, fallback),
            price_inc_vat: price_inc_vat(product.price_ex_vat, product.vat_rate),
            in_stock: product.in_stock(),
            images: product.images.iter().map(|i| i.display_url(cdn)).collect(),
            slug: product.slug,
            reference: product.reference,
            brand: product.brand,
            price_ex_vat: product.price_ex_vat,
            vat_rate: product.vat_rate,
            stock: product.stock,
            variants,
        }))
    }

    fn variant_summary(&self, member: &Product, viewed: &Product, locale: Locale) -> VariantSummary {
        VariantSummary {
            id: member.id,
            slug: member.slug.clone(),
            name: member.display_name(locale, self.options.fallback_locale),
            price_ex_vat: member.price_ex_vat,
            in_stock: member.in_stock(),
            current: member.id == viewed.id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOptions;
    use crate::test_support::{InMemoryCatalog, product};
    use brico_core::{GroupId, ImageId, ProductImage, ProductText};

    #[tokio::test]
    async fn test_detail_with_variants_and_sorted_images() {
        let store = InMemoryCatalog::new();

        let mut viewed = product(2);
        viewed.slug = Some(Slug::from_trusted("sierra-grande"));
        viewed.group_id = Some(GroupId::new(5));
        viewed.group_order = Some(2);
        viewed.price_ex_vat = Decimal::new(60, 0);
        viewed.vat_rate = Some(Decimal::new(21, 0));
        viewed.texts = vec![ProductText {
            locale: Locale::Es,
            name: Some("Sierra grande".to_owned()),
            description: Some("Hoja de 60 cm".to_owned()),
        }];
        viewed.images = vec![
            ProductImage::new(ImageId::new(1), "https://img/b.jpg", None),
            ProductImage::new(ImageId::new(2), "https://img/a.jpg", Some(1)),
        ];
        store.add_product(viewed);

        let mut sibling = product(1);
        sibling.group_id = Some(GroupId::new(5));
        sibling.group_order = Some(1);
        store.add_product(sibling);

        let catalog = Catalog::new(&store, CatalogOptions::default());
        let detail = catalog
            .product_by_slug("sierra-grande", Locale::En)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detail.name, "Sierra grande");
        assert_eq!(detail.description.as_deref(), Some("Hoja de 60 cm"));
        assert_eq!(detail.price_inc_vat, Decimal::new(726, 1));
        assert_eq!(detail.images, vec!["https://img/a.jpg", "https://img/b.jpg"]);

        let variant_ids: Vec<_> = detail.variants.iter().map(|v| v.id.as_i32()).collect();
        assert_eq!(variant_ids, vec![1, 2]);
        assert!(detail.variants.iter().any(|v| v.current && v.id.as_i32() == 2));
    }

    #[tokio::test]
    async fn test_unknown_slug_is_none() {
        let store = InMemoryCatalog::new();
        let catalog = Catalog::new(&store, CatalogOptions::default());
        assert!(catalog.product_by_slug("nope", Locale::Es).await.unwrap().is_none());
    }
}
