//! Row types for the `catalog` schema and their mapping to domain records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use brico_core::{
    Category, CategoryId, CategoryPlacement, GroupId, ImageId, IndexableProduct, Locale, Product,
    ProductId, ProductImage, ProductText, Slug,
};

use super::RepositoryError;

/// Column list matching [`ProductRow`]; expects the table aliased as `p`.
pub(super) const PRODUCT_COLUMNS: &str = "p.id, p.ref AS reference, p.name, p.brand, \
     p.price_ex_vat, p.vat_rate, p.stock, p.category_id, p.group_id, p.group_order, \
     p.slug, p.created_at, p.updated_at";

/// Column list matching [`ImageRow`].
pub(super) const IMAGE_COLUMNS: &str = "id, product_id, url, sort, cdn_public_id, \
     cdn_format, cdn_width, cdn_height, cdn_version";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    parent_id: Option<CategoryId>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: Slug::from_trusted(row.slug),
            parent_id: row.parent_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: ProductId,
    reference: Option<String>,
    name: Option<String>,
    brand: Option<String>,
    price_ex_vat: Decimal,
    vat_rate: Option<Decimal>,
    stock: Option<i32>,
    category_id: Option<CategoryId>,
    group_id: Option<GroupId>,
    group_order: Option<i32>,
    slug: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product, RepositoryError> {
        if self.price_ex_vat < Decimal::ZERO {
            return Err(RepositoryError::DataCorruption(format!(
                "product {} has negative price {}",
                self.id, self.price_ex_vat
            )));
        }

        Ok(Product {
            id: self.id,
            reference: self.reference,
            name: self.name,
            texts: Vec::new(),
            brand: self.brand,
            price_ex_vat: self.price_ex_vat,
            vat_rate: self.vat_rate,
            stock: self.stock,
            category_id: self.category_id,
            images: Vec::new(),
            group_id: self.group_id,
            group_order: self.group_order,
            slug: self.slug.filter(|s| !s.is_empty()).map(Slug::from_trusted),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A product row joined with its category and that category's parent.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct IndexRow {
    #[sqlx(flatten)]
    pub product: ProductRow,
    category_slug: Option<String>,
    parent_slug: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TextRow {
    product_id: ProductId,
    lang: String,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ImageRow {
    id: ImageId,
    product_id: ProductId,
    url: String,
    sort: i32,
    cdn_public_id: Option<String>,
    cdn_format: Option<String>,
    cdn_width: Option<i32>,
    cdn_height: Option<i32>,
    cdn_version: Option<i32>,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            sort: row.sort,
            cdn_public_id: row.cdn_public_id,
            cdn_format: row.cdn_format,
            cdn_width: row.cdn_width,
            cdn_height: row.cdn_height,
            cdn_version: row.cdn_version,
        }
    }
}

/// Attach texts and images to product rows, preserving row order.
pub(super) fn assemble(
    rows: Vec<ProductRow>,
    texts: Vec<TextRow>,
    images: Vec<ImageRow>,
) -> Result<Vec<Product>, RepositoryError> {
    let mut texts_by_product: HashMap<ProductId, Vec<ProductText>> = HashMap::new();
    for row in texts {
        let locale = Locale::parse(&row.lang).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "product {} has text in {e}",
                row.product_id
            ))
        })?;
        texts_by_product
            .entry(row.product_id)
            .or_default()
            .push(ProductText {
                locale,
                name: row.name,
                description: row.description,
            });
    }

    let mut images_by_product: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
    for row in images {
        images_by_product
            .entry(row.product_id)
            .or_default()
            .push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let id = row.id;
            let mut product = row.into_product()?;
            product.texts = texts_by_product.remove(&id).unwrap_or_default();
            product.images = images_by_product.remove(&id).unwrap_or_default();
            Ok(product)
        })
        .collect()
}

/// Split index rows into product rows and their placements.
pub(super) fn split_index_rows(
    rows: Vec<IndexRow>,
) -> (Vec<ProductRow>, Vec<Option<CategoryPlacement>>) {
    rows.into_iter()
        .map(|row| {
            let placement = row.category_slug.map(|slug| CategoryPlacement {
                slug: Slug::from_trusted(slug),
                parent_slug: row.parent_slug.map(Slug::from_trusted),
            });
            (row.product, placement)
        })
        .unzip()
}

/// Zip assembled products back with their placements.
pub(super) fn with_placements(
    products: Vec<Product>,
    placements: Vec<Option<CategoryPlacement>>,
) -> Vec<IndexableProduct> {
    products
        .into_iter()
        .zip(placements)
        .map(|(product, category)| IndexableProduct { product, category })
        .collect()
}
