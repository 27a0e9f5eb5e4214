//! Database operations for the Emporium `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users`, `addresses` - Accounts and saved addresses
//! - `refresh_tokens`, `password_reset_tokens`, `email_verification_tokens` - Hashed opaque tokens
//! - `categories`, `products`, `product_reviews` - Catalog
//! - `carts`, `cart_items` - One cart per user
//! - `orders`, `order_items` - Placed orders with product snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` rows) so the
//! crate builds without a live database or an offline query cache.

pub mod addresses;
pub mod carts;
pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod tokens;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation. Holds the offending field name.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key constraint violation.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl RepositoryError {
    /// Classify a write error by Postgres constraint kind.
    ///
    /// Unique violations become [`RepositoryError::Conflict`] with the column
    /// name derived from the constraint (`products_sku_key` -> `sku`).
    #[must_use]
    pub fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                let field = constraint_field(db_err.constraint());
                return Self::Conflict(field);
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKey(db_err.constraint().unwrap_or("unknown").to_string());
            }
        }
        Self::Database(e)
    }
}

/// Tables whose unique constraints follow the `<table>_<columns>_key` naming.
const TABLES: &[&str] = &[
    "users",
    "refresh_tokens",
    "password_reset_tokens",
    "email_verification_tokens",
    "addresses",
    "categories",
    "products",
    "product_reviews",
    "carts",
    "cart_items",
    "orders",
    "order_items",
];

/// Derive a column name from a `<table>_<columns>_key` constraint name.
fn constraint_field(constraint: Option<&str>) -> String {
    let Some(constraint) = constraint else {
        return "Field".to_string();
    };

    let without_table = TABLES
        .iter()
        .find_map(|t| {
            constraint
                .strip_prefix(t)
                .and_then(|rest| rest.strip_prefix('_'))
        })
        .unwrap_or(constraint);

    without_table
        .strip_suffix("_key")
        .unwrap_or(without_table)
        .to_string()
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_field() {
        assert_eq!(constraint_field(Some("products_sku_key")), "sku");
        assert_eq!(constraint_field(Some("users_email_key")), "email");
        assert_eq!(
            constraint_field(Some("product_reviews_product_id_user_id_key")),
            "product_id_user_id"
        );
        assert_eq!(constraint_field(Some("addresses_one_default_idx")), "one_default_idx");
        assert_eq!(constraint_field(Some("odd_name")), "odd_name");
        assert_eq!(constraint_field(None), "Field");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("pro"), "%pro%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = RepositoryError::from_write(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
