//! Payment provider integration.
//!
//! - `stripe` - Payment intent API client
//! - `webhook` - Signed webhook verification and event parsing

mod error;
pub mod stripe;
pub mod webhook;

pub use error::PaymentError;
pub use stripe::{PaymentIntent, StripeClient};
pub use webhook::{WebhookEvent, verify_signature};
