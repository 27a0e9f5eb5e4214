//! Order repository.
//!
//! Checkout and cancellation write several tables at once. Their steps are
//! free functions over any executor and are called with a transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};

use emporium_core::pagination::PageRequest;
use emporium_core::{OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{
    AdminOrder, AdminOrderWithItems, NewOrder, Order, OrderCustomerRow, OrderItem, OrderItemRow,
    OrderItemView, OrderWithItems,
};

const SELECT_ORDER_ITEM_ROWS: &str = r"
    SELECT oi.*, p.name AS product_name, p.images AS product_images
    FROM order_items oi
    JOIN products p ON p.id = oi.product_id";

const SELECT_ORDER_CUSTOMER_ROWS: &str = r"
    SELECT o.*,
           u.first_name AS customer_first_name,
           u.last_name AS customer_last_name,
           u.email AS customer_email,
           (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS item_count
    FROM orders o
    JOIN users u ON u.id = o.user_id";

/// A provider payment to reconcile against orders.
#[derive(Debug, Clone, Copy)]
pub struct PaymentMatch<'a> {
    pub payment_id: &'a str,
    /// The user the payment was made for.
    pub user_id: UserId,
    /// Amount paid, in minor currency units.
    pub amount_minor: i64,
}

// =============================================================================
// Transactional steps
// =============================================================================

/// Insert an order row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number is taken.
pub async fn insert_order<'e, E>(executor: E, new: &NewOrder) -> Result<Order, RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>(
        r"
        INSERT INTO orders (
            id, order_number, user_id, subtotal, tax, shipping, total,
            shipping_address, billing_address, payment_method, payment_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        ",
    )
    .bind(OrderId::new())
    .bind(&new.order_number)
    .bind(new.user_id)
    .bind(new.totals.subtotal)
    .bind(new.totals.tax)
    .bind(new.totals.shipping)
    .bind(new.totals.total)
    .bind(&new.shipping_address)
    .bind(&new.billing_address)
    .bind(&new.payment_method)
    .bind(&new.payment_id)
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::from_write)
}

/// Insert an order item with its product snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::ForeignKey` if the order or product is missing.
pub async fn insert_item<'e, E>(
    executor: E,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
    snapshot: &Value,
) -> Result<OrderItem, RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, OrderItem>(
        r"
        INSERT INTO order_items (id, order_id, product_id, quantity, price, product_snapshot)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(OrderItemId::new())
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .bind(snapshot)
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::from_write)
}

/// Take `quantity` units out of stock.
///
/// Returns `false` without writing when stock is short.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_inventory<'e, E>(
    executor: E,
    product_id: ProductId,
    quantity: i32,
) -> Result<bool, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        UPDATE products
        SET inventory = inventory - $2, updated_at = NOW()
        WHERE id = $1 AND inventory >= $2
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Put `quantity` units back into stock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn increment_inventory<'e, E>(
    executor: E,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE products SET inventory = inventory + $2, updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .bind(quantity)
        .execute(executor)
        .await?;
    Ok(())
}

/// Lock a user's order for update.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_user<'e, E>(
    executor: E,
    id: OrderId,
    user_id: UserId,
) -> Result<Option<Order>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(order)
}

/// Items of one order, without product details.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_of<'e, E>(executor: E, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at ASC",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;
    Ok(items)
}

/// Move an order to `CANCELLED` if it is still cancellable.
///
/// Returns `None` when the order left the cancellable states concurrently.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_cancelled<'e, E>(executor: E, id: OrderId) -> Result<Option<Order>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let order = sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET status = 'CANCELLED', updated_at = NOW()
        WHERE id = $1 AND status IN ('PENDING', 'CONFIRMED')
        RETURNING *
        ",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(order)
}

fn group_items(rows: Vec<OrderItemRow>) -> HashMap<OrderId, Vec<OrderItemView>> {
    let mut grouped: HashMap<OrderId, Vec<OrderItemView>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.item.order_id)
            .or_default()
            .push(OrderItemView::from(row));
    }
    grouped
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn item_rows(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItemRow>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{SELECT_ORDER_ITEM_ROWS} WHERE oi.order_id = ANY($1) ORDER BY oi.created_at ASC");
        let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_ids)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut grouped = group_items(self.item_rows(&ids).await?);
        Ok(orders
            .into_iter()
            .map(|order| {
                let items = grouped.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    /// A page of a user's orders, newest first, with items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<OrderWithItems>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((self.with_items(orders).await?, total))
    }

    /// A user's latest orders without items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Get an order with items, only if the user owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    /// A page of all orders, newest first, with customer and items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<AdminOrderWithItems>, i64), RepositoryError> {
        let sql = format!("{SELECT_ORDER_CUSTOMER_ROWS} ORDER BY o.created_at DESC LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, OrderCustomerRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(self.pool)
            .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
        let mut grouped = group_items(self.item_rows(&ids).await?);
        let orders = rows
            .into_iter()
            .map(|row| {
                let items = grouped.remove(&row.order.id).unwrap_or_default();
                AdminOrderWithItems {
                    order: AdminOrder::from(row),
                    items,
                }
            })
            .collect();

        Ok((orders, total))
    }

    /// The most recent orders with their customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AdminOrder>, RepositoryError> {
        let sql = format!("{SELECT_ORDER_CUSTOMER_ROWS} ORDER BY o.created_at DESC LIMIT $1");
        let rows = sqlx::query_as::<_, OrderCustomerRow>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(AdminOrder::from).collect())
    }

    /// Current status of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_of(&self, id: OrderId) -> Result<Option<OrderStatus>, RepositoryError> {
        let status = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(status)
    }

    /// Move an order from `expected` to `status` and, when given, set its
    /// tracking number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist or is
    /// no longer in `expected`.
    pub async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(
            r"
            UPDATE orders
            SET status = $2,
                tracking_number = COALESCE($3, tracking_number),
                updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING *
            ",
        )
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .bind(expected)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a payment outcome on the orders it actually paid for.
    ///
    /// Only orders placed by the intent's owner whose total equals the
    /// intent amount are touched. With `confirm` set, pending orders also
    /// move to `CONFIRMED`. Returns the number of orders touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_payment(
        &self,
        payment: &PaymentMatch<'_>,
        payment_status: PaymentStatus,
        confirm: bool,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET payment_status = $2,
                status = CASE WHEN $3 AND status = 'PENDING' THEN 'CONFIRMED'::order_status ELSE status END,
                updated_at = NOW()
            WHERE payment_id = $1
              AND user_id = $4
              AND ROUND(total * 100)::int8 = $5
            ",
        )
        .bind(payment.payment_id)
        .bind(payment_status)
        .bind(confirm)
        .bind(payment.user_id)
        .bind(payment.amount_minor)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
