//! Order placement and cancellation.
//!
//! Both run in a single database transaction: inventory is decremented with a
//! guarded update, so a short product rolls back the whole order.

use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};
use sqlx::PgPool;
use thiserror::Error;

use emporium_core::pricing::{OrderTotals, cart_subtotal};
use emporium_core::{OrderId, OrderStatus, UserId};

use crate::db::RepositoryError;
use crate::db::carts::{self, CartRepository};
use crate::db::orders;
use crate::models::order::{
    NewOrder, Order, OrderItemProduct, OrderItemView, OrderWithItems, PostalAddress,
};
use crate::models::user::User;
use crate::services::email::Mailer;

const ORDER_SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ORDER_SUFFIX_LEN: usize = 9;

/// Errors from placing or cancelling orders.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No cart, or a cart without lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line's product was deactivated after it was added.
    #[error("product is no longer available: {0}")]
    ProductUnavailable(String),

    /// Stock is short for a line.
    #[error("insufficient inventory for {0}")]
    InsufficientInventory(String),

    /// The caller has no such order.
    #[error("order not found")]
    OrderNotFound,

    /// The order is past the cancellable states.
    #[error("order cannot be cancelled in status {0}")]
    NotCancellable(OrderStatus),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Shipping, billing and payment details supplied at checkout.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub shipping_address: PostalAddress,
    pub billing_address: Option<PostalAddress>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    mailer: &'a Mailer,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: &'a Mailer) -> Self {
        Self { pool, mailer }
    }

    /// Turn the user's cart into an order.
    ///
    /// Inserts the order and its items, takes stock and clears the cart in
    /// one transaction, then emails a confirmation best-effort.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to order.
    /// Returns `CheckoutError::InsufficientInventory` if any line is short.
    pub async fn place_order(
        &self,
        user: &User,
        details: &OrderDetails,
    ) -> Result<OrderWithItems, CheckoutError> {
        let cart = CartRepository::new(self.pool)
            .find_by_user(user.id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        let mut tx = self.pool.begin().await?;

        let lines = carts::cart_lines(&mut *tx, cart.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(line) = lines.iter().find(|l| !l.product.is_active) {
            return Err(CheckoutError::ProductUnavailable(line.product.name.clone()));
        }

        let totals = OrderTotals::compute(cart_subtotal(&lines));
        let new_order = NewOrder {
            order_number: generate_order_number(Utc::now().timestamp_millis()),
            user_id: user.id,
            totals,
            shipping_address: address_json(&details.shipping_address),
            billing_address: details.billing_address.as_ref().map(address_json),
            payment_method: details.payment_method.clone(),
            payment_id: details.payment_id.clone(),
        };

        let order = orders::insert_order(&mut *tx, &new_order).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let snapshot = json!({
                "name": line.product.name,
                "images": line.product.images,
                "selectedVariant": line.item.selected_variant,
            });
            let item = orders::insert_item(
                &mut *tx,
                order.id,
                line.product.id,
                line.item.quantity,
                line.product.price,
                &snapshot,
            )
            .await?;

            if !orders::decrement_inventory(&mut *tx, line.product.id, line.item.quantity).await? {
                // Dropping `tx` rolls back the order and any stock already taken
                return Err(CheckoutError::InsufficientInventory(line.product.name.clone()));
            }

            items.push(OrderItemView {
                item,
                product: OrderItemProduct {
                    id: line.product.id,
                    name: line.product.name.clone(),
                    images: line.product.images.clone(),
                },
            });
        }

        carts::clear_cart(&mut *tx, cart.id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            user_id = %user.id,
            total = %order.total,
            "Order placed"
        );

        if let Err(e) = self
            .mailer
            .send_order_confirmation(
                &user.email,
                &user.first_name,
                &order.order_number,
                &order.total,
                order.status,
            )
            .await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send order confirmation email");
        }

        Ok(OrderWithItems { order, items })
    }

    /// Cancel one of the user's orders and restock its items.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` if the user has no such order.
    /// Returns `CheckoutError::NotCancellable` unless the order is pending or confirmed.
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::lock_for_user(&mut *tx, order_id, user_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        if !order.status.is_cancellable() {
            return Err(CheckoutError::NotCancellable(order.status));
        }

        let cancelled = orders::mark_cancelled(&mut *tx, order.id)
            .await?
            .ok_or(CheckoutError::NotCancellable(order.status))?;

        for item in orders::items_of(&mut *tx, order.id).await? {
            orders::increment_inventory(&mut *tx, item.product_id, item.quantity).await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order.id, user_id = %user_id, "Order cancelled");
        Ok(cancelled)
    }
}

fn address_json(address: &PostalAddress) -> Value {
    json!({
        "street": address.street,
        "city": address.city,
        "state": address.state,
        "zipCode": address.zip_code,
        "country": address.country,
    })
}

/// Build an order number: `ORD-<unix millis>-<9 uppercase base36 chars>`.
#[must_use]
pub fn generate_order_number(unix_millis: i64) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_SUFFIX_LEN)
        .map(|_| char::from(ORDER_SUFFIX_ALPHABET[rng.random_range(0..ORDER_SUFFIX_ALPHABET.len())]))
        .collect();
    format!("ORD-{unix_millis}-{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number(1_717_171_717_171);
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], "1717171717171");
        assert_eq!(parts[2].len(), ORDER_SUFFIX_LEN);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_order_numbers_differ() {
        let a = generate_order_number(1);
        let b = generate_order_number(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_address_json_uses_camel_case() {
        let address = PostalAddress {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "US".to_string(),
        };
        let value = address_json(&address);
        assert_eq!(value["zipCode"], "62701");
        assert!(value.get("zip_code").is_none());
    }
}
