//! Order handlers.
//!
//! ```text
//! GET /api/orders                - Caller's orders, newest first
//! GET /api/orders/{id}           - One of the caller's orders
//! POST /api/orders               - Place an order from the cart
//! PUT /api/orders/{id}/cancel    - Cancel a pending or confirmed order
//! GET /api/orders/admin/all      - Every order with its customer (admin)
//! PUT /api/orders/{id}/status    - Set status and tracking number (admin)
//! ```

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::pagination::Pagination;
use emporium_core::{OrderId, OrderStatus};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::order::{AdminOrderWithItems, Order, OrderWithItems, PostalAddress};
use crate::routes::extract::{PageQuery, ValidJson, ValidPath, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::routes::validation::check_required;
use crate::services::checkout::{CheckoutService, OrderDetails};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: PostalAddress,
    pub billing_address: Option<PostalAddress>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage<T> {
    pub orders: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct OrderData<T> {
    pub order: T,
}

fn order_not_found() -> AppError {
    AppError::not_found("ORDER_NOT_FOUND", "Order not found")
}

fn check_address(prefix: &str, address: &PostalAddress) -> Result<()> {
    for (field, value) in [
        ("street", &address.street),
        ("city", &address.city),
        ("state", &address.state),
        ("zipCode", &address.zip_code),
        ("country", &address.country),
    ] {
        check_required(&format!("{prefix}.{field}"), value)?;
    }
    Ok(())
}

/// The caller's orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<OrderPage<OrderWithItems>>> {
    let page = query.to_request()?;
    let (orders, total) = OrderRepository::new(state.pool())
        .list_for_user(user.id, page)
        .await?;

    Ok(ApiResponse::ok(OrderPage {
        orders,
        pagination: page.meta(total),
    }))
}

/// One of the caller's orders. Other users' orders are reported as missing.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
pub async fn get_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(id): ValidPath<OrderId>,
) -> Result<ApiResponse<OrderData<OrderWithItems>>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await?
        .ok_or_else(order_not_found)?;
    Ok(ApiResponse::ok(OrderData { order }))
}

/// Place an order from the caller's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<CreateOrderRequest>,
) -> Result<ApiResponse<OrderData<OrderWithItems>>> {
    check_address("shippingAddress", &body.shipping_address)?;
    if let Some(billing) = &body.billing_address {
        check_address("billingAddress", billing)?;
    }

    let details = OrderDetails {
        shipping_address: body.shipping_address,
        billing_address: body.billing_address,
        payment_method: body.payment_method,
        payment_id: body.payment_id,
    };
    let order = CheckoutService::new(state.pool(), state.mailer())
        .place_order(&user, &details)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order.order_number.as_str())]),
    );

    Ok(ApiResponse::created(OrderData { order }).with_message("Order created successfully"))
}

/// Cancel one of the caller's orders and restock its items.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(id): ValidPath<OrderId>,
) -> Result<ApiResponse<OrderData<Order>>> {
    let order = CheckoutService::new(state.pool(), state.mailer())
        .cancel_order(user.id, id)
        .await?;
    Ok(ApiResponse::ok(OrderData { order }).with_message("Order cancelled successfully"))
}

/// Every order, newest first.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list_all_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<OrderPage<AdminOrderWithItems>>> {
    let page = query.to_request()?;
    let (orders, total) = OrderRepository::new(state.pool()).list_all(page).await?;

    Ok(ApiResponse::ok(OrderPage {
        orders,
        pagination: page.meta(total),
    }))
}

fn check_transition(current: OrderStatus, next: OrderStatus) -> Result<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "INVALID_STATUS_TRANSITION",
            format!("Cannot change status of a {current} order"),
        ))
    }
}

/// Set an order's status and, optionally, its tracking number.
///
/// Cancelled and refunded orders keep their status.
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %id, status = %body.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<OrderId>,
    ValidJson(body): ValidJson<UpdateStatusRequest>,
) -> Result<ApiResponse<OrderData<Order>>> {
    let orders = OrderRepository::new(state.pool());
    let current = orders.status_of(id).await?.ok_or_else(order_not_found)?;
    check_transition(current, body.status)?;

    let order = orders
        .update_status(id, current, body.status, body.tracking_number.as_deref())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::conflict(
                "ORDER_STATUS_CHANGED",
                "Order status changed concurrently, please retry",
            ),
            other => other.into(),
        })?;

    tracing::info!(from = %current, "Order status updated");
    Ok(ApiResponse::ok(OrderData { order }).with_message("Order status updated successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> PostalAddress {
        PostalAddress {
            street: "1 Infinite Loop".to_string(),
            city: "Cupertino".to_string(),
            state: "CA".to_string(),
            zip_code: "95014".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_address_requires_every_field() {
        assert!(check_address("shippingAddress", &address()).is_ok());

        let mut blank = address();
        blank.zip_code = " ".to_string();
        let err = check_address("shippingAddress", &blank).unwrap_err();
        assert_eq!(err.parts().2, "shippingAddress.zipCode is required");
    }

    #[test]
    fn test_status_request_rejects_unknown_status() {
        let ok: UpdateStatusRequest =
            serde_json::from_value(json!({"status": "SHIPPED", "trackingNumber": "1Z999"}))
                .unwrap();
        assert_eq!(ok.status, OrderStatus::Shipped);

        assert!(serde_json::from_value::<UpdateStatusRequest>(json!({"status": "LOST"})).is_err());
    }

    #[test]
    fn test_cancelled_order_cannot_be_reopened() {
        let err = check_transition(OrderStatus::Cancelled, OrderStatus::Pending).unwrap_err();
        let (status, code, message) = err.parts();
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_STATUS_TRANSITION");
        assert_eq!(message, "Cannot change status of a CANCELLED order");

        assert!(check_transition(OrderStatus::Refunded, OrderStatus::Confirmed).is_err());
        assert!(check_transition(OrderStatus::Cancelled, OrderStatus::Cancelled).is_ok());
        assert!(check_transition(OrderStatus::Shipped, OrderStatus::Delivered).is_ok());
    }
}
