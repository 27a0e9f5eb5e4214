//! Stripe payment intent client.
//!
//! Talks to the Stripe REST API directly with form-encoded requests.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use emporium_core::UserId;
use emporium_core::pricing::to_minor_units;

use super::PaymentError;
use crate::config::StripeConfig;

/// Intent status Stripe reports once funds are captured.
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Metadata key carrying the ID of the user who created the intent.
pub const OWNER_METADATA_KEY: &str = "userId";

const INTENT_ID_PREFIX: &str = "pi_";

/// Whether `id` has the shape of a payment intent ID (`pi_` then `[A-Za-z0-9_]`).
///
/// IDs end up in request paths, so anything else is refused before a request
/// is built.
#[must_use]
pub fn is_valid_intent_id(id: &str) -> bool {
    id.strip_prefix(INTENT_ID_PREFIX).is_some_and(|rest| {
        !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// A Stripe payment intent, reduced to the fields the store uses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }

    /// The user recorded in the intent's metadata, if it parses.
    #[must_use]
    pub fn owner(&self) -> Option<UserId> {
        self.metadata.get(OWNER_METADATA_KEY)?.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a payment intent for `amount` in major units.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` for non-positive amounts.
    /// Returns `PaymentError::IntentCreation` if Stripe rejects the request.
    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        let amount_minor = to_minor_units(amount)
            .filter(|minor| *minor > 0)
            .ok_or(PaymentError::InvalidAmount)?;
        let form = intent_form(amount_minor, currency, metadata);

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::IntentCreation(e.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::IntentCreation(format!(
                "{} - {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|e| PaymentError::IntentCreation(e.to_string()))?;
        tracing::info!(payment_intent_id = %intent.id, amount = amount_minor, "Payment intent created");
        Ok(intent)
    }

    /// Retrieve a payment intent by ID.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidIntentId` if `id` is not an intent ID.
    /// Returns `PaymentError::IntentRetrieval` if Stripe rejects the request.
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        if !is_valid_intent_id(id) {
            return Err(PaymentError::InvalidIntentId);
        }

        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{id}", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| PaymentError::IntentRetrieval(e.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::IntentRetrieval(format!(
                "{} - {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::IntentRetrieval(e.to_string()))
    }
}

/// Form fields for `POST /v1/payment_intents`.
fn intent_form(
    amount_minor: i64,
    currency: &str,
    metadata: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), amount_minor.to_string()),
        ("currency".to_string(), currency.to_lowercase()),
    ];
    form.extend(
        metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
    );
    form
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_form_encodes_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("userId".to_string(), "u-1".to_string());
        metadata.insert("cartId".to_string(), "c-9".to_string());

        let form = intent_form(12_099, "USD", &metadata);
        assert_eq!(
            form,
            vec![
                ("amount".to_string(), "12099".to_string()),
                ("currency".to_string(), "usd".to_string()),
                ("metadata[cartId]".to_string(), "c-9".to_string()),
                ("metadata[userId]".to_string(), "u-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_error_message_prefers_stripe_message() {
        let body = r#"{"error":{"message":"Invalid API Key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Invalid API Key provided");
        assert_eq!(error_message("gateway down"), "gateway down");
    }

    #[test]
    fn test_intent_id_shape() {
        assert!(is_valid_intent_id("pi_3NtYx2LkdIwHu7ix0Ab12345"));
        assert!(is_valid_intent_id("pi_a_b"));

        assert!(!is_valid_intent_id("pi_"));
        assert!(!is_valid_intent_id("ch_3NtYx2LkdIwHu7ix"));
        assert!(!is_valid_intent_id("../customers/cus_123"));
        assert!(!is_valid_intent_id("pi_1/../../customers/cus_123"));
        assert!(!is_valid_intent_id("pi_1?expand[]=customer"));
        assert!(!is_valid_intent_id("pi_1%2F.."));
    }

    #[tokio::test]
    async fn test_retrieve_refuses_path_traversal_without_a_request() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_test_emporium"),
            webhook_secret: None,
            // Nothing listens here; a request would surface as IntentRetrieval
            api_base: "http://127.0.0.1:1".to_string(),
        };
        let client = StripeClient::new(&config).unwrap();

        let err = client
            .retrieve_payment_intent("../customers/cus_123")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidIntentId));
    }

    #[test]
    fn test_owner_reads_user_id_metadata() {
        let user = UserId::new();
        let mut intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "amount": 5000,
            "currency": "usd",
            "status": "succeeded",
            "metadata": {"userId": user.to_string()}
        }))
        .unwrap();
        assert_eq!(intent.owner(), Some(user));

        intent
            .metadata
            .insert(OWNER_METADATA_KEY.to_string(), "not-a-uuid".to_string());
        assert_eq!(intent.owner(), None);

        intent.metadata.clear();
        assert_eq!(intent.owner(), None);
    }

    #[test]
    fn test_payment_intent_parses_stripe_shape() {
        let json = r#"{
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 2000,
            "currency": "usd",
            "status": "succeeded",
            "client_secret": "pi_123_secret_abc",
            "metadata": {"userId": "u-1"}
        }"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert!(intent.is_succeeded());
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));

        let out = serde_json::to_value(&intent).unwrap();
        assert_eq!(out["clientSecret"], "pi_123_secret_abc");
    }
}
