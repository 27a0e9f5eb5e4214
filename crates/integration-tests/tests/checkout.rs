//! Cart arithmetic, order totals and inventory accounting.
//!
//! Requires a running API server with the seeded admin account.
//! Run with: cargo test -p emporium-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use emporium_integration_tests::{
    ApiClient, create_product, decimal, expect_json, pool, shipping_address,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

async fn add_to_cart(client: &ApiClient, product: &Value, quantity: i32) -> Value {
    let response = client
        .post(
            "/api/cart/items",
            &json!({ "productId": product["id"], "quantity": quantity }),
        )
        .await;
    expect_json(response, StatusCode::OK).await["data"]["cart"].clone()
}

async fn inventory_of(product: &Value) -> i64 {
    let id = product["id"].as_str().unwrap();
    let response = ApiClient::anonymous()
        .get(&format!("/api/products/{id}"))
        .await;
    expect_json(response, StatusCode::OK).await["data"]["product"]["inventory"]
        .as_i64()
        .unwrap()
}

async fn place_order(client: &ApiClient) -> Value {
    let response = client
        .post(
            "/api/orders",
            &json!({ "shippingAddress": shipping_address(), "paymentMethod": "stripe" }),
        )
        .await;
    expect_json(response, StatusCode::CREATED).await["data"]["order"].clone()
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cart_subtotal_is_sum_of_lines() {
    let admin = ApiClient::admin().await;
    let mug = create_product(&admin, "12.50", 20).await;
    let lamp = create_product(&admin, "20.00", 20).await;
    let (customer, _) = ApiClient::register().await;

    add_to_cart(&customer, &mug, 2).await;
    let cart = add_to_cart(&customer, &lamp, 1).await;

    let lines: Decimal = cart["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| {
            decimal(&item["product"]["price"]) * Decimal::from(item["quantity"].as_i64().unwrap())
        })
        .sum();

    assert_eq!(decimal(&cart["subtotal"]), lines);
    assert_eq!(decimal(&cart["subtotal"]), Decimal::new(45, 0));
    assert_eq!(cart["itemCount"], 3);

    // Adding the same product again merges into one line
    let cart = add_to_cart(&customer, &mug, 1).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(decimal(&cart["subtotal"]), Decimal::new(575, 1));
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_order_below_threshold_pays_shipping() {
    let admin = ApiClient::admin().await;
    let mug = create_product(&admin, "12.50", 20).await;
    let lamp = create_product(&admin, "20.00", 20).await;
    let (customer, _) = ApiClient::register().await;

    add_to_cart(&customer, &mug, 2).await;
    add_to_cart(&customer, &lamp, 1).await;
    let order = place_order(&customer).await;

    assert_eq!(decimal(&order["subtotal"]), Decimal::new(45, 0));
    assert_eq!(decimal(&order["tax"]), Decimal::new(450, 2));
    assert_eq!(decimal(&order["shipping"]), Decimal::new(10, 0));
    assert_eq!(decimal(&order["total"]), Decimal::new(5950, 2));
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["paymentStatus"], "PENDING");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));

    // Checkout empties the cart
    let response = customer.get("/api/cart").await;
    let cart = expect_json(response, StatusCode::OK).await;
    assert!(cart["data"]["cart"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_order_above_threshold_ships_free_and_decrements_inventory() {
    let admin = ApiClient::admin().await;
    let chair = create_product(&admin, "60.00", 7).await;
    let (customer, _) = ApiClient::register().await;

    let before = inventory_of(&chair).await;
    add_to_cart(&customer, &chair, 2).await;
    let order = place_order(&customer).await;

    assert_eq!(decimal(&order["subtotal"]), Decimal::new(120, 0));
    assert_eq!(decimal(&order["tax"]), Decimal::new(12, 0));
    assert_eq!(decimal(&order["shipping"]), Decimal::ZERO);
    assert_eq!(decimal(&order["total"]), Decimal::new(132, 0));
    assert_eq!(inventory_of(&chair).await, before - 2);

    // Cancelling a pending order restores stock
    let id = order["id"].as_str().unwrap();
    let response = customer
        .put(&format!("/api/orders/{id}/cancel"), &json!({}))
        .await;
    let cancelled = expect_json(response, StatusCode::OK).await;
    assert_eq!(cancelled["data"]["order"]["status"], "CANCELLED");
    assert_eq!(inventory_of(&chair).await, before);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cart_rejects_quantity_beyond_inventory() {
    let admin = ApiClient::admin().await;
    let rare = create_product(&admin, "15.00", 1).await;
    let (customer, _) = ApiClient::register().await;

    let response = customer
        .post(
            "/api/cart/items",
            &json!({ "productId": rare["id"], "quantity": 2 }),
        )
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_checkout_with_empty_cart_fails() {
    let (customer, _) = ApiClient::register().await;
    let response = customer
        .post("/api/orders", &json!({ "shippingAddress": shipping_address() }))
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "EMPTY_CART");
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_stock_shortfall_at_checkout_rolls_back_everything() {
    let admin = ApiClient::admin().await;
    let kettle = create_product(&admin, "30.00", 10).await;
    let toaster = create_product(&admin, "45.00", 10).await;
    let (customer, registered) = ApiClient::register().await;
    let user_id: Uuid = registered["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    add_to_cart(&customer, &kettle, 2).await;
    add_to_cart(&customer, &toaster, 3).await;

    // Stock drops after the items were carted
    let toaster_id = toaster["id"].as_str().unwrap();
    let response = admin
        .put(&format!("/api/products/{toaster_id}"), &json!({ "inventory": 1 }))
        .await;
    expect_json(response, StatusCode::OK).await;

    let response = customer
        .post(
            "/api/orders",
            &json!({ "shippingAddress": shipping_address(), "paymentMethod": "stripe" }),
        )
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");

    // No order row survives the failed attempt
    let pool = pool().await;
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);

    // Neither line's stock was taken
    assert_eq!(inventory_of(&kettle).await, 10);
    assert_eq!(inventory_of(&toaster).await, 1);

    // The cart is untouched
    let response = customer.get("/api/cart").await;
    let cart = expect_json(response, StatusCode::OK).await["data"]["cart"].clone();
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["itemCount"], 5);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cancelled_order_cannot_be_reopened_and_restocked_twice() {
    let admin = ApiClient::admin().await;
    let vase = create_product(&admin, "40.00", 5).await;
    let (customer, _) = ApiClient::register().await;

    add_to_cart(&customer, &vase, 2).await;
    let order = place_order(&customer).await;
    let id = order["id"].as_str().unwrap();

    let response = customer
        .put(&format!("/api/orders/{id}/cancel"), &json!({}))
        .await;
    expect_json(response, StatusCode::OK).await;
    assert_eq!(inventory_of(&vase).await, 5);

    let response = admin
        .put(&format!("/api/orders/{id}/status"), &json!({ "status": "PENDING" }))
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "INVALID_STATUS_TRANSITION");

    let response = customer
        .put(&format!("/api/orders/{id}/cancel"), &json!({}))
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "ORDER_CANNOT_BE_CANCELLED");
    assert_eq!(inventory_of(&vase).await, 5);
}
