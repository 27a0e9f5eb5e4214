//! Stripe webhook verification.
//!
//! The `Stripe-Signature` header looks like `t=<unix ts>,v1=<hex>[,v1=<hex>]`.
//! Each `v1` is an HMAC-SHA256 over `"{t}.{raw body}"` keyed with the
//! endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use super::{PaymentError, PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: Value,
}

impl WebhookEvent {
    /// Parse an event from a verified body.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidPayload` if the body is not an event.
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// ID of the object the event is about, e.g. the payment intent ID.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(Value::as_str)
    }

    /// The event object as a payment intent, for `payment_intent.*` events.
    #[must_use]
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

/// Verify a webhook signature header against the raw body.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the header is malformed, the
/// timestamp is outside the tolerance, or no `v1` signature matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
    if signatures.is_empty() || (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Constant-time comparison
    if signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok())
    {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature)
    }
}
