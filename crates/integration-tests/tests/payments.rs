//! Payment reconciliation against stored orders.
//!
//! Stripe is not called: these tests drive `OrderRepository::mark_payment`
//! directly with the owner and amount a real intent would carry.
//!
//! Run with: cargo test -p emporium-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use emporium_api::db::orders::{OrderRepository, PaymentMatch};
use emporium_core::{PaymentStatus, UserId};
use emporium_integration_tests::{
    ApiClient, create_product, decimal, expect_json, pool, shipping_address,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

/// Place a one-line order carrying `payment_id`. Returns the customer, their
/// ID and the order.
async fn order_paid_with(payment_id: &str, price: &str) -> (ApiClient, UserId, Value) {
    let admin = ApiClient::admin().await;
    let product = create_product(&admin, price, 5).await;
    let (customer, registered) = ApiClient::register().await;
    let user_id: UserId = registered["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let response = customer
        .post(
            "/api/cart/items",
            &json!({ "productId": product["id"], "quantity": 1 }),
        )
        .await;
    expect_json(response, StatusCode::OK).await;

    let response = customer
        .post(
            "/api/orders",
            &json!({
                "shippingAddress": shipping_address(),
                "paymentMethod": "stripe",
                "paymentId": payment_id,
            }),
        )
        .await;
    let order = expect_json(response, StatusCode::CREATED).await["data"]["order"].clone();
    (customer, user_id, order)
}

async fn payment_status_of(customer: &ApiClient, order: &Value) -> Value {
    let id = order["id"].as_str().unwrap();
    let response = customer.get(&format!("/api/orders/{id}")).await;
    expect_json(response, StatusCode::OK).await["data"]["order"]["paymentStatus"].clone()
}

fn intent_id() -> String {
    format!("pi_it{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_payment_only_settles_owner_order_for_exact_amount() {
    let payment_id = intent_id();
    // 25.00 + 2.50 tax + 10.00 shipping
    let (customer, owner, order) = order_paid_with(&payment_id, "25.00").await;
    assert_eq!(decimal(&order["total"]), Decimal::new(3750, 2));

    let pool = pool().await;
    let orders = OrderRepository::new(&pool);

    // Someone else's payment
    let stranger = PaymentMatch {
        payment_id: &payment_id,
        user_id: UserId::new(),
        amount_minor: 3750,
    };
    assert_eq!(
        orders.mark_payment(&stranger, PaymentStatus::Paid, true).await.unwrap(),
        0
    );

    // A smaller payment reusing the order's intent ID
    let underpaid = PaymentMatch {
        payment_id: &payment_id,
        user_id: owner,
        amount_minor: 50,
    };
    assert_eq!(
        orders.mark_payment(&underpaid, PaymentStatus::Paid, true).await.unwrap(),
        0
    );
    assert_eq!(payment_status_of(&customer, &order).await, "PENDING");

    let exact = PaymentMatch {
        payment_id: &payment_id,
        user_id: owner,
        amount_minor: 3750,
    };
    assert_eq!(
        orders.mark_payment(&exact, PaymentStatus::Paid, true).await.unwrap(),
        1
    );
    assert_eq!(payment_status_of(&customer, &order).await, "PAID");
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_shared_intent_id_does_not_settle_other_users_orders() {
    let payment_id = intent_id();
    let (payer, payer_id, payer_order) = order_paid_with(&payment_id, "25.00").await;
    let (other, other_id, other_order) = order_paid_with(&payment_id, "25.00").await;
    assert_ne!(payer_id, other_id);

    let pool = pool().await;
    let paid = PaymentMatch {
        payment_id: &payment_id,
        user_id: payer_id,
        amount_minor: 3750,
    };
    let updated = OrderRepository::new(&pool)
        .mark_payment(&paid, PaymentStatus::Paid, false)
        .await
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(payment_status_of(&payer, &payer_order).await, "PAID");
    assert_eq!(payment_status_of(&other, &other_order).await, "PENDING");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_confirm_rejects_malformed_intent_id() {
    let (customer, _) = ApiClient::register().await;
    let response = customer
        .post(
            "/api/payments/stripe/confirm",
            &json!({ "paymentIntentId": "../customers/cus_123" }),
        )
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid payment intent ID");
}
