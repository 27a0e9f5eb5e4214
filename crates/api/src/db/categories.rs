//! Category repository.

use sqlx::PgPool;

use emporium_core::CategoryId;

use super::RepositoryError;
use crate::models::catalog::{Category, CategoryUpdate, CategoryWithCount, NewCategory};

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All active categories by name, each with its active product count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryWithCount>(
            r"
            SELECT c.*,
                   (SELECT COUNT(*) FROM products p
                    WHERE p.category_id = c.id AND p.is_active) AS product_count
            FROM categories c
            WHERE c.is_active
            ORDER BY c.name ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a category by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Get an active category with its product count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_with_count(
        &self,
        id: CategoryId,
    ) -> Result<Option<CategoryWithCount>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryWithCount>(
            r"
            SELECT c.*,
                   (SELECT COUNT(*) FROM products p
                    WHERE p.category_id = c.id AND p.is_active) AS product_count
            FROM categories c
            WHERE c.id = $1 AND c.is_active
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Active children of a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_children(
        &self,
        parent_id: CategoryId,
    ) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryWithCount>(
            r"
            SELECT c.*,
                   (SELECT COUNT(*) FROM products p
                    WHERE p.category_id = c.id AND p.is_active) AS product_count
            FROM categories c
            WHERE c.parent_id = $1 AND c.is_active
            ORDER BY c.name ASC
            ",
        )
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::ForeignKey` if the parent doesn't exist.
    pub async fn create(&self, new: &NewCategory) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (id, name, slug, description, image, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(CategoryId::new())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(&new.image)
        .bind(new.parent_id)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            UPDATE categories
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                image = COALESCE($5, image),
                parent_id = COALESCE($6, parent_id),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.slug)
        .bind(&update.description)
        .bind(&update.image)
        .bind(update.parent_id)
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::NotFound)
    }

    /// Number of products, active or not, that reference a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_count(&self, id: CategoryId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Soft-delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn deactivate(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE categories SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
