//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, token refresh, password recovery
//! - `checkout` - Order placement and cancellation
//! - `email` - Transactional email (SMTP or log-only)
//! - `payments` - Stripe payment intents and webhooks
//! - `tokens` - JWT issuing/verification and opaque token digests

pub mod auth;
pub mod checkout;
pub mod email;
pub mod payments;
pub mod tokens;
