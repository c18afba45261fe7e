//! The listing card shared by category browsing and search.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Product;
use crate::types::{Locale, ProductId, Slug};

/// One tile in a product grid.
///
/// Both query paths normalize to this shape. Category listings display the
/// price excluding tax and leave `price_inc_vat` empty; search hits carry the
/// tax-inclusive price computed at indexing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: ProductId,
    pub slug: Option<Slug>,
    pub name: String,
    pub brand: Option<String>,
    pub price_ex_vat: Decimal,
    pub price_inc_vat: Option<Decimal>,
    pub in_stock: bool,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
}

impl Card {
    /// Build a card from a relational product row.
    #[must_use]
    pub fn from_product(product: &Product, locale: Locale, fallback: Locale) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.display_name(locale, fallback),
            brand: product.brand.clone(),
            price_ex_vat: product.price_ex_vat,
            price_inc_vat: None,
            in_stock: product.in_stock(),
            stock: product.stock,
            image_url: product.primary_image().map(|img| img.url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductImage;
    use crate::catalog::product::fixtures::product;
    use crate::types::ImageId;

    #[test]
    fn test_card_from_product_keeps_price_ex_vat() {
        let mut p = product(4);
        p.price_ex_vat = Decimal::new(60, 0);
        p.vat_rate = Some(Decimal::new(21, 0));
        p.stock = Some(2);
        p.images = vec![ProductImage::new(ImageId::new(9), "https://img/a.jpg", Some(1))];

        let card = Card::from_product(&p, Locale::Es, Locale::Es);
        assert_eq!(card.price_ex_vat, Decimal::new(60, 0));
        assert_eq!(card.price_inc_vat, None);
        assert!(card.in_stock);
        assert_eq!(card.image_url.as_deref(), Some("https://img/a.jpg"));
        assert_eq!(card.name, "Producto base 4");
    }
}
