//! Aggregate queries for the admin dashboard.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::dashboard::{DashboardStats, OrderPayment, StatusCount, TopProduct};

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store-wide totals. Revenue counts delivered orders only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM products WHERE is_active) AS total_products,
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COALESCE(SUM(total), 0) FROM orders WHERE status = 'DELIVERED') AS total_revenue
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }

    /// Best sellers by quantity sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r"
            SELECT p.id, p.name, p.price, p.images,
                   SUM(oi.quantity)::int8 AS total_sold,
                   COUNT(DISTINCT oi.order_id) AS order_count
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            GROUP BY p.id
            ORDER BY total_sold DESC, p.name ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Orders placed since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_since(&self, since: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE created_at >= $1")
            .bind(since)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Delivered revenue from orders placed since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_since(&self, since: DateTime<Utc>) -> Result<Decimal, RepositoryError> {
        let revenue = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM orders WHERE status = 'DELIVERED' AND created_at >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(revenue)
    }

    /// Accounts created since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn users_since(&self, since: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= $1")
            .bind(since)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Order counts per status since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            r"
            SELECT status, COUNT(*) AS count
            FROM orders
            WHERE created_at >= $1
            GROUP BY status
            ORDER BY status
            ",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Payment state of every order placed since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_payments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderPayment>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderPayment>(
            r"
            SELECT id, order_number, total, status, payment_status, created_at
            FROM orders
            WHERE created_at >= $1
            ORDER BY created_at
            ",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
