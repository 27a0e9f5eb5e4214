//! Product repository.
//!
//! Catalog listings are built with `sqlx::QueryBuilder` because the filter
//! set is dynamic. Sort columns come from a closed enum, never from input text.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use emporium_core::pagination::PageRequest;
use emporium_core::{CategoryId, ProductId};

use super::{RepositoryError, like_pattern};
use crate::models::catalog::{
    NewProduct, Product, ProductAdminListing, ProductRow, ProductUpdate,
};

const SELECT_PRODUCT_ROWS: &str = r"
    SELECT p.*,
           c.name AS category_name,
           c.slug AS category_slug,
           COALESCE(AVG(r.rating)::float8, 0) AS avg_rating,
           COUNT(r.id) AS review_count
    FROM products p
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN product_reviews r ON r.product_id = p.id
    WHERE p.is_active";

/// Catalog sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Price,
    #[default]
    CreatedAt,
    Rating,
}

impl SortField {
    const fn column(self) -> &'static str {
        match self {
            Self::Name => "p.name",
            Self::Price => "p.price",
            Self::CreatedAt => "p.created_at",
            Self::Rating => "avg_rating",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters for catalog listings. Every filter is optional.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(category) = filter.category {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products matching a filter, with rating aggregates.
    ///
    /// Returns the page of rows and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductRow>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_PRODUCT_ROWS);
        push_filters(&mut qb, filter);
        qb.push(" GROUP BY p.id, c.id ORDER BY ")
            .push(filter.sort_by.column())
            .push(" ")
            .push(filter.sort_order.keyword())
            .push(", p.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM products p WHERE p.is_active",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((rows, total))
    }

    /// The newest active products, used for featured and recommendation rails.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest(&self, limit: i64) -> Result<Vec<ProductRow>, RepositoryError> {
        let (rows, _) = self
            .list(&ProductFilter::default(), PageRequest::first(limit))
            .await?;
        Ok(rows)
    }

    /// Get an active product with category and rating aggregates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_row(&self, id: ProductId) -> Result<Option<ProductRow>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_PRODUCT_ROWS);
        qb.push(" AND p.id = ")
            .push_bind(id)
            .push(" GROUP BY p.id, c.id");

        let row = qb
            .build_query_as::<ProductRow>()
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or SKU is taken.
    /// Returns `RepositoryError::ForeignKey` if the category doesn't exist.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (
                id, name, slug, description, price, compare_price, inventory, sku,
                category_id, images, variants, weight, seo_data
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            ",
        )
        .bind(ProductId::new())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.compare_price)
        .bind(new.inventory)
        .bind(&new.sku)
        .bind(new.category_id)
        .bind(&new.images)
        .bind(&new.variants)
        .bind(new.weight)
        .bind(&new.seo_data)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug or SKU is taken.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                compare_price = COALESCE($6, compare_price),
                inventory = COALESCE($7, inventory),
                sku = COALESCE($8, sku),
                category_id = COALESCE($9, category_id),
                images = COALESCE($10, images),
                variants = COALESCE($11, variants),
                weight = COALESCE($12, weight),
                seo_data = COALESCE($13, seo_data),
                is_active = COALESCE($14, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.slug)
        .bind(&update.description)
        .bind(update.price)
        .bind(update.compare_price)
        .bind(update.inventory)
        .bind(&update.sku)
        .bind(update.category_id)
        .bind(&update.images)
        .bind(&update.variants)
        .bind(update.weight)
        .bind(&update.seo_data)
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// All products, newest first, with usage counts for the admin listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn admin_list(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<ProductAdminListing>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, ProductAdminListing>(
            r"
            SELECT p.*,
                   c.name AS category_name,
                   (SELECT COUNT(*) FROM order_items oi WHERE oi.product_id = p.id) AS order_item_count,
                   (SELECT COUNT(*) FROM product_reviews r WHERE r.product_id = p.id) AS review_count
            FROM products p
            JOIN categories c ON c.id = p.category_id
            ORDER BY p.created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;

        Ok((rows, total))
    }
}
