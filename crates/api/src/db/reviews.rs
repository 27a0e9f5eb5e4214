//! Product review repository.

use sqlx::PgPool;

use emporium_core::pagination::PageRequest;
use emporium_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::catalog::{NewReview, Review, ReviewRow, ReviewUpdate};

const SELECT_REVIEW_ROWS: &str = r"
    SELECT r.*, u.first_name AS author_first_name, u.last_name AS author_last_name
    FROM product_reviews r
    JOIN users u ON u.id = r.user_id";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of reviews for a product, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> Result<(Vec<ReviewRow>, i64), RepositoryError> {
        let sql = format!(
            "{SELECT_REVIEW_ROWS} WHERE r.product_id = $1 ORDER BY r.created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(product_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_reviews WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(self.pool)
                .await?;

        Ok((rows, total))
    }

    /// Every review of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewRow>, RepositoryError> {
        let sql = format!("{SELECT_REVIEW_ROWS} WHERE r.product_id = $1 ORDER BY r.created_at DESC");
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, Review>("SELECT * FROM product_reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Whether a user already reviewed a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_for(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_reviews WHERE product_id = $1 AND user_id = $2)",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    pub async fn create(&self, new: &NewReview) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r"
            INSERT INTO product_reviews (id, product_id, user_id, rating, title, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(ReviewId::new())
        .bind(new.product_id)
        .bind(new.user_id)
        .bind(new.rating)
        .bind(&new.title)
        .bind(&new.comment)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Update a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn update(&self, id: ReviewId, update: &ReviewUpdate) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r"
            UPDATE product_reviews
            SET rating = COALESCE($2, rating),
                title = COALESCE($3, title),
                comment = COALESCE($4, comment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.rating)
        .bind(&update.title)
        .bind(&update.comment)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
