//! Shopping cart handlers. Every route requires authentication.
//!
//! ```text
//! GET    /api/cart             - Current cart with totals
//! POST   /api/cart/items       - Add a product (merges with an existing line)
//! PUT    /api/cart/items/{id}  - Set line quantity
//! DELETE /api/cart/items/{id}  - Remove a line
//! DELETE /api/cart             - Remove every line
//! ```
//!
//! Mutations answer with the whole cart so clients can refresh totals
//! without a second request.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use emporium_core::{CartItemId, ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::CartView;
use crate::routes::extract::{ValidJson, ValidPath};
use crate::routes::response::ApiResponse;
use crate::state::AppState;

const fn default_quantity() -> i32 {
    1
}

fn empty_variant() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default = "empty_variant")]
    pub selected_variant: Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartData {
    pub cart: CartView,
}

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(AppError::validation("quantity must be greater than or equal to 1"));
    }
    Ok(())
}

fn insufficient_inventory() -> AppError {
    AppError::bad_request("INSUFFICIENT_INVENTORY", "Insufficient inventory")
}

fn item_not_found() -> AppError {
    AppError::not_found("CART_ITEM_NOT_FOUND", "Cart item not found")
}

async fn load_cart(state: &AppState, user_id: UserId) -> Result<CartView> {
    let repo = CartRepository::new(state.pool());
    let cart = repo.get_or_create(user_id).await?;
    let items = repo.lines(cart.id).await?;
    Ok(CartView::new(cart, items))
}

/// The caller's cart, created on first access.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartData>> {
    let cart = load_cart(&state, user.id).await?;
    Ok(ApiResponse::ok(CartData { cart }))
}

/// Add a product, or raise the quantity of its existing line.
///
/// Inventory must cover the combined quantity.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %body.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<AddItemRequest>,
) -> Result<ApiResponse<CartData>> {
    check_quantity(body.quantity)?;

    let product = ProductRepository::new(state.pool())
        .get(body.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("PRODUCT_NOT_FOUND", "Product not found"))?;
    if product.inventory < body.quantity {
        return Err(insufficient_inventory());
    }

    let repo = CartRepository::new(state.pool());
    let cart = repo.get_or_create(user.id).await?;

    match repo.find_item_by_product(cart.id, product.id).await? {
        Some(existing) => {
            let combined = existing.quantity.saturating_add(body.quantity);
            if product.inventory < combined {
                return Err(insufficient_inventory());
            }
            repo.set_quantity(existing.id, combined).await?;
        }
        None => {
            repo.insert_item(cart.id, product.id, body.quantity, &body.selected_variant)
                .await?;
        }
    }

    let items = repo.lines(cart.id).await?;
    Ok(ApiResponse::ok(CartData {
        cart: CartView::new(cart, items),
    })
    .with_message("Item added to cart successfully"))
}

/// Set the quantity of one of the caller's cart lines.
#[instrument(skip_all, fields(user_id = %user.id, item_id = %item_id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(item_id): ValidPath<CartItemId>,
    ValidJson(body): ValidJson<UpdateItemRequest>,
) -> Result<ApiResponse<CartData>> {
    check_quantity(body.quantity)?;

    let repo = CartRepository::new(state.pool());
    let line = repo
        .find_user_line(item_id, user.id)
        .await?
        .ok_or_else(item_not_found)?;
    if line.product.inventory < body.quantity {
        return Err(insufficient_inventory());
    }

    repo.set_quantity(item_id, body.quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => item_not_found(),
            other => other.into(),
        })?;

    let cart = load_cart(&state, user.id).await?;
    Ok(ApiResponse::ok(CartData { cart }).with_message("Cart item updated successfully"))
}

/// Remove one of the caller's cart lines.
#[instrument(skip_all, fields(user_id = %user.id, item_id = %item_id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(item_id): ValidPath<CartItemId>,
) -> Result<ApiResponse<CartData>> {
    let repo = CartRepository::new(state.pool());
    repo.find_user_line(item_id, user.id)
        .await?
        .ok_or_else(item_not_found)?;

    repo.delete_item(item_id).await.map_err(|e| match e {
        RepositoryError::NotFound => item_not_found(),
        other => other.into(),
    })?;

    let cart = load_cart(&state, user.id).await?;
    Ok(ApiResponse::ok(CartData { cart }).with_message("Item removed from cart successfully"))
}

/// Remove every line from the caller's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<()>> {
    let repo = CartRepository::new(state.pool());
    if let Some(cart) = repo.find_by_user(user.id).await? {
        repo.clear(cart.id).await?;
    }
    Ok(ApiResponse::message("Cart cleared successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_request_defaults() {
        let body: AddItemRequest =
            serde_json::from_value(json!({"productId": ProductId::new()})).unwrap();
        assert_eq!(body.quantity, 1);
        assert_eq!(body.selected_variant, json!({}));
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(check_quantity(1).is_ok());
        assert_eq!(check_quantity(0).unwrap_err().parts().1, "VALIDATION_ERROR");
        assert!(check_quantity(-3).is_err());
    }
}
