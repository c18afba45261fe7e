//! `PostgreSQL` implementation of [`CatalogStore`].

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use brico_core::{
    Category, CategoryId, GroupId, IndexableProduct, Locale, Product, ProductId, Slug,
};

use super::RepositoryError;
use super::rows::{
    CategoryRow, IMAGE_COLUMNS, ImageRow, IndexRow, PRODUCT_COLUMNS, ProductRow, TextRow,
    assemble, split_index_rows, with_placements,
};
use crate::catalog::{CatalogStore, CategoryFacets, ListingScope};

/// Which images to load alongside a batch of products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Images {
    None,
    First,
    All,
}

/// Catalog store backed by the `catalog` schema.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (used by health checks).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load texts and images for `rows` and assemble full products.
    async fn hydrate(
        &self,
        rows: Vec<ProductRow>,
        locales: &[Locale],
        images: Images,
    ) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let langs: Vec<String> = locales.iter().map(|l| l.as_str().to_owned()).collect();

        let texts: Vec<TextRow> = sqlx::query_as(
            r"
            SELECT product_id, lang, name, description
            FROM catalog.product_i18n
            WHERE product_id = ANY($1) AND lang = ANY($2)
            ORDER BY product_id, id
            ",
        )
        .bind(&ids)
        .bind(&langs)
        .fetch_all(&self.pool)
        .await?;

        let image_sql = match images {
            Images::None => return assemble(rows, texts, Vec::new()),
            Images::First => format!(
                "SELECT DISTINCT ON (product_id) {IMAGE_COLUMNS} FROM catalog.product_image \
                 WHERE product_id = ANY($1) ORDER BY product_id, sort ASC, id ASC"
            ),
            Images::All => format!(
                "SELECT {IMAGE_COLUMNS} FROM catalog.product_image \
                 WHERE product_id = ANY($1) ORDER BY product_id, sort ASC, id ASC"
            ),
        };
        let images: Vec<ImageRow> = sqlx::query_as(&image_sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        assemble(rows, texts, images)
    }

    async fn hydrate_indexable(
        &self,
        rows: Vec<IndexRow>,
        locales: &[Locale],
    ) -> Result<Vec<IndexableProduct>, RepositoryError> {
        let (rows, placements) = split_index_rows(rows);
        let products = self.hydrate(rows, locales, Images::First).await?;
        Ok(with_placements(products, placements))
    }
}

fn id_array<T: Copy + Into<i32>>(ids: &[T]) -> Vec<i32> {
    ids.iter().map(|&id| id.into()).collect()
}

impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, slug, parent_id FROM catalog.category WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    #[instrument(skip(self, parents), fields(frontier = parents.len()))]
    async fn child_category_ids(
        &self,
        parents: &[CategoryId],
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, CategoryId>(
            "SELECT id FROM catalog.category WHERE parent_id = ANY($1)",
        )
        .bind(id_array(parents))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn child_categories(&self, parent: CategoryId) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"
            SELECT id, name, slug, parent_id
            FROM catalog.category
            WHERE parent_id = $1
            ORDER BY name ASC, id ASC
            ",
        )
        .bind(parent)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self))]
    async fn root_categories(&self, limit: u32) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"
            SELECT id, name, slug, parent_id
            FROM catalog.category
            WHERE parent_id IS NULL
            ORDER BY name ASC, id ASC
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self, scope), fields(categories = scope.categories.len()))]
    async fn listing_rows(&self, scope: ListingScope<'_>) -> Result<Vec<Product>, RepositoryError> {
        let filters = scope.filters;
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.category_id = ANY("
        ));
        qb.push_bind(id_array(scope.categories)).push(")");

        if !filters.brands.is_empty() {
            qb.push(" AND p.brand = ANY(")
                .push_bind(filters.brands.clone())
                .push(")");
        }
        if filters.in_stock {
            qb.push(" AND p.stock > 0");
        }
        if let Some(min) = filters.price_min {
            qb.push(" AND p.price_ex_vat >= ").push_bind(min);
        }
        if let Some(max) = filters.price_max {
            qb.push(" AND p.price_ex_vat <= ").push_bind(max);
        }
        qb.push(" ORDER BY p.group_id ASC NULLS LAST, p.group_order ASC NULLS LAST, p.id ASC");

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        self.hydrate(rows, scope.locales, Images::First).await
    }

    #[instrument(skip(self, categories), fields(categories = categories.len()))]
    async fn facets(&self, categories: &[CategoryId]) -> Result<CategoryFacets, RepositoryError> {
        let ids = id_array(categories);

        let brands = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT brand
            FROM catalog.product
            WHERE category_id = ANY($1) AND brand IS NOT NULL
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let (price_min, price_max, in_stock_count, total_count): (
            Option<Decimal>,
            Option<Decimal>,
            i64,
            i64,
        ) = sqlx::query_as(
            r"
            SELECT MIN(price_ex_vat), MAX(price_ex_vat),
                   COUNT(*) FILTER (WHERE stock > 0), COUNT(*)
            FROM catalog.product
            WHERE category_id = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(CategoryFacets {
            brands,
            price_min,
            price_max,
            in_stock_count,
            total_count,
        })
    }

    #[instrument(skip(self, locales))]
    async fn latest_products(
        &self,
        limit: u32,
        locales: &[Locale],
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p ORDER BY p.id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows, locales, Images::First).await
    }

    #[instrument(skip(self, locales))]
    async fn product_by_slug(
        &self,
        slug: &str,
        locales: &[Locale],
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self
            .hydrate(vec![row], locales, Images::All)
            .await?
            .into_iter()
            .next())
    }

    #[instrument(skip(self, locales))]
    async fn group_members(
        &self,
        group: GroupId,
        locales: &[Locale],
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p \
             WHERE p.group_id = $1 ORDER BY p.group_order ASC NULLS LAST, p.id ASC"
        ))
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows, locales, Images::None).await
    }

    #[instrument(skip(self, locales))]
    async fn indexable_products(
        &self,
        after: Option<ProductId>,
        limit: u32,
        locales: &[Locale],
    ) -> Result<Vec<IndexableProduct>, RepositoryError> {
        let rows: Vec<IndexRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug, parent.slug AS parent_slug \
             FROM catalog.product p \
             LEFT JOIN catalog.category c ON c.id = p.category_id \
             LEFT JOIN catalog.category parent ON parent.id = c.parent_id \
             WHERE ($1::int4 IS NULL OR p.id > $1) \
             ORDER BY p.id ASC \
             LIMIT $2"
        ))
        .bind(after)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_indexable(rows, locales).await
    }

    #[instrument(skip(self, locales))]
    async fn indexable_product(
        &self,
        id: ProductId,
        locales: &[Locale],
    ) -> Result<Option<IndexableProduct>, RepositoryError> {
        let rows: Vec<IndexRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug, parent.slug AS parent_slug \
             FROM catalog.product p \
             LEFT JOIN catalog.category c ON c.id = p.category_id \
             LEFT JOIN catalog.category parent ON parent.id = c.parent_id \
             WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.hydrate_indexable(rows, locales).await?.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn products_missing_slug(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p \
             WHERE p.slug IS NULL OR p.slug = '' \
             ORDER BY p.id ASC \
             LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows, &Locale::ALL, Images::None).await
    }

    #[instrument(skip(self), fields(slug = %slug))]
    async fn assign_slug(&self, id: ProductId, slug: &Slug) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE catalog.product SET slug = $1, updated_at = now() WHERE id = $2")
            .bind(slug.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "slug"))?;

        Ok(())
    }
}
