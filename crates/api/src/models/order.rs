//! Orders and order items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use emporium_core::pricing::OrderTotals;
use emporium_core::{
    Email, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::user::CustomerSummary;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub shipping_address: Value,
    pub billing_address: Option<Value>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
    pub product_snapshot: Value,
    pub created_at: DateTime<Utc>,
}

/// Order item row joined with the live product name and images.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    #[sqlx(flatten)]
    pub item: OrderItem,
    pub product_name: String,
    pub product_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemProduct {
    pub id: ProductId,
    pub name: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: OrderItemProduct,
}

impl From<OrderItemRow> for OrderItemView {
    fn from(row: OrderItemRow) -> Self {
        let product = OrderItemProduct {
            id: row.item.product_id,
            name: row.product_name,
            images: row.product_images,
        };
        Self {
            item: row.item,
            product,
        }
    }
}

/// An order with its items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

/// Order row joined with the customer's name and email.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderCustomerRow {
    #[sqlx(flatten)]
    pub order: Order,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: Email,
    pub item_count: i64,
}

/// Admin view of an order: the order, its customer and item count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub user: CustomerSummary,
    pub item_count: i64,
}

impl From<OrderCustomerRow> for AdminOrder {
    fn from(row: OrderCustomerRow) -> Self {
        let user = CustomerSummary {
            id: row.order.user_id,
            first_name: row.customer_first_name,
            last_name: row.customer_last_name,
            email: row.customer_email,
        };
        Self {
            order: row.order,
            user,
            item_count: row.item_count,
        }
    }
}

/// Admin order listing entry including items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderWithItems {
    #[serde(flatten)]
    pub order: AdminOrder,
    pub items: Vec<OrderItemView>,
}

/// Postal address frozen into an order as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Fields for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub totals: OrderTotals,
    pub shipping_address: Value,
    pub billing_address: Option<Value>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
}
