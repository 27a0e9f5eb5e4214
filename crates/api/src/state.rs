//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::email::{MailError, Mailer};
use crate::services::payments::{PaymentError, StripeClient};
use crate::services::tokens::JwtKeys;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email setup failed: {0}")]
    Mail(#[from] MailError),
    #[error("stripe client setup failed: {0}")]
    Stripe(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    jwt: JwtKeys,
    mailer: Mailer,
    stripe: StripeClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or HTTP client cannot be configured.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = Mailer::new(config.email.as_ref())?;
        Self::with_mailer(config, pool, mailer)
    }

    /// Create a state with an explicit mailer.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be configured.
    pub fn with_mailer(config: ApiConfig, pool: PgPool, mailer: Mailer) -> Result<Self, StateError> {
        let jwt = JwtKeys::new(&config.jwt);
        let stripe = StripeClient::new(&config.stripe)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                mailer,
                stripe,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the JWT signing keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Get the transactional mailer.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    /// Get the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }
}
