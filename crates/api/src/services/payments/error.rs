//! Payment error types.

use thiserror::Error;

/// Errors from payment provider calls and webhook handling.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP client could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Creating a payment intent failed upstream.
    #[error("payment intent creation failed: {0}")]
    IntentCreation(String),

    /// Retrieving a payment intent failed upstream.
    #[error("payment intent retrieval failed: {0}")]
    IntentRetrieval(String),

    /// The intent exists but has not succeeded.
    #[error("payment not completed (status: {0})")]
    NotCompleted(String),

    /// Caller-supplied ID is not a payment intent ID.
    #[error("invalid payment intent ID")]
    InvalidIntentId,

    /// The intent was created for another user.
    #[error("payment intent belongs to another user")]
    NotOwner,

    /// Amount is not positive or does not fit in minor units.
    #[error("invalid amount")]
    InvalidAmount,

    /// Webhook signature header missing, malformed, stale or wrong.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Webhook body is not a valid event.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Webhook secret not configured.
    #[error("webhook secret not configured")]
    NotConfigured,
}
