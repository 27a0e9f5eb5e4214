//! Cart repository.
//!
//! Each user owns at most one cart (unique `carts.user_id`). The line queries
//! are free functions over any executor so checkout can run them inside its
//! transaction.

use serde_json::Value;
use sqlx::{PgExecutor, PgPool};

use emporium_core::{CartId, CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem, CartLine, CartLineRow};

const SELECT_CART_LINES: &str = r"
    SELECT ci.*,
           p.name AS product_name,
           p.slug AS product_slug,
           p.price AS product_price,
           p.images AS product_images,
           p.inventory AS product_inventory,
           p.is_active AS product_is_active
    FROM cart_items ci
    JOIN products p ON p.id = ci.product_id";

/// Lines of a cart joined with their products, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn cart_lines<'e, E>(executor: E, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("{SELECT_CART_LINES} WHERE ci.cart_id = $1 ORDER BY ci.created_at ASC");
    let rows = sqlx::query_as::<_, CartLineRow>(&sql)
        .bind(cart_id)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

/// Remove every line of a cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear_cart<'e, E>(executor: E, cart_id: CartId) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Return the user's cart, creating an empty one on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict
        sqlx::query_as::<_, Cart>(
            r"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            ",
        )
        .bind(CartId::new())
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Find the user's cart without creating one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(cart)
    }

    /// Lines of a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        cart_lines(self.pool, cart_id).await
    }

    /// Find a cart line by ID, only if it belongs to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user_line(
        &self,
        item_id: CartItemId,
        user_id: UserId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let sql = format!(
            "{SELECT_CART_LINES} JOIN carts c ON c.id = ci.cart_id WHERE ci.id = $1 AND c.user_id = $2"
        );
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(CartLine::from))
    }

    /// Find the line for a product in a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_item_by_product(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }

    /// Add a new line to a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already in the cart.
    pub async fn insert_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        selected_variant: &Value,
    ) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, selected_variant)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(CartItemId::new())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(selected_variant)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn set_quantity(
        &self,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            "UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn delete_item(&self, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove every line of a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        clear_cart(self.pool, cart_id).await
    }
}
