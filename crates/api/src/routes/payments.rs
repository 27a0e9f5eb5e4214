//! Payment handlers.
//!
//! ```text
//! POST /api/payments/stripe/create-intent  - Create a Stripe payment intent (auth)
//! POST /api/payments/stripe/confirm        - Confirm a succeeded intent (auth)
//! POST /api/payments/stripe/webhook        - Signed Stripe events
//! POST /api/payments/paypal/create-order   - PayPal placeholder (auth)
//! POST /api/payments/paypal/capture        - PayPal placeholder (auth)
//! ```

use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use emporium_core::PaymentStatus;

use crate::db::orders::{OrderRepository, PaymentMatch};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::routes::extract::ValidJson;
use crate::routes::response::ApiResponse;
use crate::routes::validation::check_required;
use crate::services::payments::stripe::OWNER_METADATA_KEY;
use crate::services::payments::{PaymentError, PaymentIntent, WebhookEvent, verify_signature};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";
const EVENT_SUCCEEDED: &str = "payment_intent.succeeded";
const EVENT_FAILED: &str = "payment_intent.payment_failed";
const PAYPAL_ORDER_ID: &str = "PAYPAL_ORDER_ID";
const PAYPAL_APPROVAL_URL: &str = "https://paypal.com/approve";

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCaptureRequest {
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentData {
    pub payment_intent: PaymentIntent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalOrder {
    pub order_id: String,
    pub approval_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCapture {
    pub order_id: Option<String>,
    pub status: &'static str,
}

/// Client metadata with the caller's ID applied last, so it cannot be spoofed.
fn intent_metadata(
    mut metadata: BTreeMap<String, String>,
    user_id: &impl ToString,
) -> BTreeMap<String, String> {
    metadata.insert(OWNER_METADATA_KEY.to_string(), user_id.to_string());
    metadata
}

/// Orders an intent may settle: its owner's, for exactly its amount.
/// `None` when the intent carries no usable owner.
fn payment_match(intent: &PaymentIntent) -> Option<PaymentMatch<'_>> {
    Some(PaymentMatch {
        payment_id: &intent.id,
        user_id: intent.owner()?,
        amount_minor: intent.amount,
    })
}

/// Create a Stripe payment intent for the caller.
#[instrument(skip_all, fields(user_id = %user.id, currency = %body.currency))]
pub async fn create_intent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<CreateIntentRequest>,
) -> Result<ApiResponse<IntentCreated>> {
    check_required("currency", &body.currency)?;

    let metadata = intent_metadata(body.metadata, &user.id);
    let intent = state
        .stripe()
        .create_payment_intent(body.amount, &body.currency.to_lowercase(), &metadata)
        .await?;

    Ok(ApiResponse::ok(IntentCreated {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}

/// Confirm that an intent succeeded and mark the orders paid with it as paid.
#[instrument(skip_all, fields(user_id = %user.id, payment_intent_id = %body.payment_intent_id))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<ConfirmRequest>,
) -> Result<ApiResponse<IntentData>> {
    check_required("paymentIntentId", &body.payment_intent_id)?;

    let intent = state
        .stripe()
        .retrieve_payment_intent(&body.payment_intent_id)
        .await?;
    if !intent.is_succeeded() {
        return Err(PaymentError::NotCompleted(intent.status).into());
    }
    let payment = payment_match(&intent)
        .filter(|payment| payment.user_id == user.id)
        .ok_or(PaymentError::NotOwner)?;

    let updated = OrderRepository::new(state.pool())
        .mark_payment(&payment, PaymentStatus::Paid, false)
        .await?;
    if updated == 0 {
        tracing::warn!(amount = intent.amount, "Confirmed intent matches no order");
    }
    tracing::info!(orders = updated, "Payment confirmed");

    Ok(ApiResponse::ok(IntentData {
        payment_intent: intent,
    })
    .with_message("Payment confirmed successfully"))
}

fn webhook_error() -> Response {
    (StatusCode::BAD_REQUEST, "Webhook Error").into_response()
}

/// Receive a signed Stripe event.
///
/// Verification failures answer with a plain-text 400, as Stripe expects.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let secret = state
        .config()
        .stripe
        .webhook_secret
        .as_ref()
        .ok_or(PaymentError::NotConfigured)?;

    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Stripe webhook without signature header");
        return Ok(webhook_error());
    };

    let now = chrono::Utc::now().timestamp();
    let event = match verify_signature(&body, signature, secret.expose_secret(), now)
        .and_then(|()| WebhookEvent::parse(&body))
    {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected Stripe webhook");
            return Ok(webhook_error());
        }
    };

    let orders = OrderRepository::new(state.pool());
    let intent = event.payment_intent();
    let payment = intent.as_ref().and_then(payment_match);
    match (event.event_type.as_str(), payment) {
        (EVENT_SUCCEEDED, Some(payment)) => {
            let updated = orders
                .mark_payment(&payment, PaymentStatus::Paid, true)
                .await?;
            add_breadcrumb(
                "payment",
                "Payment succeeded",
                Some(&[("payment_intent_id", payment.payment_id)]),
            );
            tracing::info!(payment_intent_id = payment.payment_id, orders = updated, "Payment succeeded");
        }
        (EVENT_FAILED, Some(payment)) => {
            let updated = orders
                .mark_payment(&payment, PaymentStatus::Failed, false)
                .await?;
            tracing::warn!(payment_intent_id = payment.payment_id, orders = updated, "Payment failed");
        }
        (EVENT_SUCCEEDED | EVENT_FAILED, None) => {
            tracing::warn!(
                event_id = %event.id,
                object_id = event.object_id(),
                "Payment event without a usable intent owner"
            );
        }
        (event_type, _) => {
            tracing::info!(event_id = %event.id, event_type, "Unhandled Stripe event");
        }
    }

    Ok(Json(json!({ "received": true })).into_response())
}

/// PayPal order creation. Returns a fixed placeholder order.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn paypal_create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResponse<PaypalOrder> {
    let paypal = &state.config().paypal;
    tracing::debug!(
        mode = ?paypal.mode,
        configured = paypal.client_id.is_some(),
        "PayPal placeholder order requested"
    );
    ApiResponse::ok(PaypalOrder {
        order_id: PAYPAL_ORDER_ID.to_string(),
        approval_url: PAYPAL_APPROVAL_URL.to_string(),
    })
    .with_message("PayPal order created (placeholder)")
}

/// PayPal capture. Echoes the order ID as completed.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn paypal_capture(
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<PaypalCaptureRequest>,
) -> ApiResponse<PaypalCapture> {
    ApiResponse::ok(PaypalCapture {
        order_id: body.order_id,
        status: "COMPLETED",
    })
    .with_message("PayPal order captured (placeholder)")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_user_id_overrides_client_value() {
        let mut client = BTreeMap::new();
        client.insert("userId".to_string(), "someone-else".to_string());
        client.insert("cartId".to_string(), "c-1".to_string());

        let metadata = intent_metadata(client, &"u-42");
        assert_eq!(metadata["userId"], "u-42");
        assert_eq!(metadata["cartId"], "c-1");
    }

    fn intent(metadata: serde_json::Value) -> PaymentIntent {
        serde_json::from_value(serde_json::json!({
            "id": "pi_789",
            "amount": 274_998,
            "currency": "usd",
            "status": "succeeded",
            "metadata": metadata,
        }))
        .unwrap()
    }

    #[test]
    fn test_payment_match_binds_owner_and_amount() {
        let owner = emporium_core::UserId::new();
        let intent = intent(serde_json::json!({"userId": owner.to_string()}));

        let payment = payment_match(&intent).unwrap();
        assert_eq!(payment.payment_id, "pi_789");
        assert_eq!(payment.user_id, owner);
        assert_eq!(payment.amount_minor, 274_998);
    }

    #[test]
    fn test_payment_match_requires_owner() {
        assert!(payment_match(&intent(serde_json::json!({}))).is_none());
        assert!(payment_match(&intent(serde_json::json!({"userId": "admin"}))).is_none());
    }

    #[test]
    fn test_create_intent_defaults() {
        let body: CreateIntentRequest =
            serde_json::from_value(serde_json::json!({"amount": "19.99"})).unwrap();
        assert_eq!(body.currency, "usd");
        assert!(body.metadata.is_empty());
        assert_eq!(body.amount, Decimal::new(1999, 2));
    }

    #[tokio::test]
    async fn test_webhook_error_is_plain_text() {
        let response = webhook_error();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Webhook Error");
    }
}
