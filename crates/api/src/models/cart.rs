//! Shopping cart types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use emporium_core::pricing::{self, PricedLine};
use emporium_core::{CartId, CartItemId, ProductId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub selected_variant: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields shown for each cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub inventory: i32,
    pub is_active: bool,
}

/// Cart item row joined with its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow {
    #[sqlx(flatten)]
    pub item: CartItem,
    pub product_name: String,
    pub product_slug: String,
    pub product_price: Decimal,
    pub product_images: Vec<String>,
    pub product_inventory: i32,
    pub product_is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: CartProduct,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        let product = CartProduct {
            id: row.item.product_id,
            name: row.product_name,
            slug: row.product_slug,
            price: row.product_price,
            images: row.product_images,
            inventory: row.product_inventory,
            is_active: row.product_is_active,
        };
        Self {
            item: row.item,
            product,
        }
    }
}

impl PricedLine for CartLine {
    fn unit_price(&self) -> Decimal {
        self.product.price
    }

    fn quantity(&self) -> i32 {
        self.item.quantity
    }
}

/// A cart with its lines and running totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub item_count: i64,
}

impl CartView {
    #[must_use]
    pub fn new(cart: Cart, items: Vec<CartLine>) -> Self {
        let subtotal = pricing::cart_subtotal(&items);
        let item_count = pricing::item_count(&items);
        Self {
            cart,
            items,
            subtotal,
            item_count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(cart_id: CartId, price: Decimal, quantity: i32) -> CartLine {
        CartLine::from(CartLineRow {
            item: CartItem {
                id: CartItemId::new(),
                cart_id,
                product_id: ProductId::new(),
                quantity,
                selected_variant: serde_json::json!({}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            product_name: "Widget".to_string(),
            product_slug: "widget".to_string(),
            product_price: price,
            product_images: vec![],
            product_inventory: 10,
            product_is_active: true,
        })
    }

    #[test]
    fn test_cart_view_totals() {
        let cart = Cart {
            id: CartId::new(),
            user_id: UserId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![
            line(cart.id, Decimal::new(1999, 2), 2),
            line(cart.id, Decimal::new(500, 2), 3),
        ];

        let view = CartView::new(cart, items);
        assert_eq!(view.subtotal, Decimal::new(5498, 2));
        assert_eq!(view.item_count, 5);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["itemCount"], 5);
        assert_eq!(json["subtotal"], "54.98");
        assert_eq!(json["items"][0]["product"]["name"], "Widget");
    }
}
