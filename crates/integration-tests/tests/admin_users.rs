//! Admin user management against a running server.
//!
//! Run with: cargo test -p emporium-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use emporium_integration_tests::{
    ApiClient, create_product, expect_json, shipping_address,
};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_user_with_orders_cannot_be_deleted() {
    let admin = ApiClient::admin().await;
    let root = ApiClient::super_admin().await;
    let lamp = create_product(&admin, "20.00", 5).await;
    let (customer, registered) = ApiClient::register().await;
    let user_id = registered["data"]["user"]["id"].as_str().unwrap();

    let response = customer
        .post("/api/cart/items", &json!({ "productId": lamp["id"], "quantity": 1 }))
        .await;
    expect_json(response, StatusCode::OK).await;
    let response = customer
        .post("/api/orders", &json!({ "shippingAddress": shipping_address() }))
        .await;
    let order = expect_json(response, StatusCode::CREATED).await["data"]["order"].clone();

    let response = root.delete(&format!("/api/users/{user_id}")).await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "USER_HAS_ORDERS");

    // The order is still there
    let response = customer
        .get(&format!("/api/orders/{}", order["id"].as_str().unwrap()))
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["data"]["order"]["orderNumber"], order["orderNumber"]);
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_user_without_orders_can_be_deleted() {
    let root = ApiClient::super_admin().await;
    let (_, registered) = ApiClient::register().await;
    let user_id = registered["data"]["user"]["id"].as_str().unwrap();

    let response = root.delete(&format!("/api/users/{user_id}")).await;
    expect_json(response, StatusCode::OK).await;

    let response = root.get(&format!("/api/users/{user_id}")).await;
    let body = expect_json(response, StatusCode::NOT_FOUND).await;
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_admin_cannot_demote_super_admin() {
    let admin = ApiClient::admin().await;
    let root = ApiClient::super_admin().await;

    let response = root.get("/api/auth/me").await;
    let me = expect_json(response, StatusCode::OK).await;
    let root_id = me["data"]["user"]["id"].as_str().unwrap();

    let response = admin
        .put(&format!("/api/users/{root_id}"), &json!({ "role": "CUSTOMER" }))
        .await;
    let body = expect_json(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let response = root.get("/api/auth/me").await;
    let me = expect_json(response, StatusCode::OK).await;
    assert_eq!(me["data"]["user"]["role"], "SUPER_ADMIN");
}
