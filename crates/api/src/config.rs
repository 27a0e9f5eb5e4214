//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Access token signing secret (min 32 chars, high entropy)
//! - `JWT_REFRESH_SECRET` - Refresh token signing secret (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 5000)
//! - `CORS_ORIGIN` - Comma-separated allowed origins (default: `http://localhost:3000`).
//!   The first origin is the public frontend URL used in email links.
//! - `JWT_EXPIRES_IN` - Access token lifetime (default: `7d`)
//! - `JWT_REFRESH_EXPIRES_IN` - Refresh token lifetime (default: `30d`)
//! - `EMAIL_HOST` - SMTP relay host; email is log-only when unset
//! - `EMAIL_PORT` - SMTP port (default: 587, 465 uses implicit TLS)
//! - `EMAIL_USER` / `EMAIL_PASS` - SMTP credentials
//! - `EMAIL_FROM` - Sender address (default: `EMAIL_USER`)
//! - `STRIPE_WEBHOOK_SECRET` - Webhook signing secret
//! - `STRIPE_API_BASE` - Stripe API base URL (default: `https://api.stripe.com`)
//! - `PAYPAL_CLIENT_ID` / `PAYPAL_CLIENT_SECRET` / `PAYPAL_MODE` - PayPal credentials
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Public frontend URL, used to build links in emails
    pub frontend_url: Url,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// SMTP configuration; `None` disables delivery
    pub email: Option<EmailConfig>,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// PayPal configuration
    pub paypal: PaypalConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// JWT signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl: TimeDelta,
    pub refresh_ttl: TimeDelta,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// SMTP relay configuration.
#[derive(Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub webhook_secret: Option<SecretString>,
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// PayPal environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaypalMode {
    #[default]
    Sandbox,
    Live,
}

/// PayPal configuration. The PayPal endpoints do not call out yet.
#[derive(Clone, Default)]
pub struct PaypalConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub mode: PaypalMode,
}

impl std::fmt::Debug for PaypalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("mode", &self.mode)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (length, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_source<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = SecretString::from(get_required_env(&var, "DATABASE_URL")?);
        let host = get_env_or_default(&var, "API_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(&var, "API_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_PORT".to_string(), e.to_string()))?;

        let cors_origins = parse_origins(&get_env_or_default(
            &var,
            "CORS_ORIGIN",
            "http://localhost:3000",
        ));
        let frontend_url = cors_origins
            .first()
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "CORS_ORIGIN".to_string(),
                    "at least one origin is required".to_string(),
                )
            })
            .and_then(|origin| {
                Url::parse(origin).map_err(|e| {
                    ConfigError::InvalidEnvVar("CORS_ORIGIN".to_string(), e.to_string())
                })
            })?;

        let jwt = JwtConfig::from_source(&var)?;
        let email = EmailConfig::from_source(&var)?;
        let stripe = StripeConfig::from_source(&var)?;
        let paypal = PaypalConfig::from_source(&var)?;

        Ok(Self {
            database_url,
            host,
            port,
            cors_origins,
            frontend_url,
            jwt,
            email,
            stripe,
            paypal,
            sentry_dsn: get_optional_env(&var, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&var, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Build an absolute link into the frontend, e.g. `reset-password?token=...`.
    #[must_use]
    pub fn frontend_link(&self, path_and_query: &str) -> String {
        format!(
            "{}/{}",
            self.frontend_url.as_str().trim_end_matches('/'),
            path_and_query.trim_start_matches('/')
        )
    }
}

impl JwtConfig {
    fn from_source<F>(var: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = get_validated_secret(var, "JWT_SECRET")?;
        let refresh_secret = get_validated_secret(var, "JWT_REFRESH_SECRET")?;

        let access_ttl = parse_duration(&get_env_or_default(var, "JWT_EXPIRES_IN", "7d"))
            .map_err(|e| ConfigError::InvalidEnvVar("JWT_EXPIRES_IN".to_string(), e))?;
        let refresh_ttl =
            parse_duration(&get_env_or_default(var, "JWT_REFRESH_EXPIRES_IN", "30d"))
                .map_err(|e| ConfigError::InvalidEnvVar("JWT_REFRESH_EXPIRES_IN".to_string(), e))?;

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        })
    }
}

impl EmailConfig {
    fn from_source<F>(var: &F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(host) = get_optional_env(var, "EMAIL_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default(var, "EMAIL_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("EMAIL_PORT".to_string(), e.to_string()))?;
        let username = get_optional_env(var, "EMAIL_USER");
        let password = get_optional_env(var, "EMAIL_PASS").map(SecretString::from);
        let from = get_optional_env(var, "EMAIL_FROM")
            .or_else(|| username.clone())
            .ok_or_else(|| ConfigError::MissingEnvVar("EMAIL_FROM".to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            from,
        }))
    }
}

impl StripeConfig {
    fn from_source<F>(var: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            secret_key: get_required_secret(var, "STRIPE_SECRET_KEY")?,
            webhook_secret: get_optional_env(var, "STRIPE_WEBHOOK_SECRET").map(SecretString::from),
            api_base: get_env_or_default(var, "STRIPE_API_BASE", "https://api.stripe.com"),
        })
    }
}

impl PaypalConfig {
    fn from_source<F>(var: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match get_env_or_default(var, "PAYPAL_MODE", "sandbox").as_str() {
            "sandbox" => PaypalMode::Sandbox,
            "live" => PaypalMode::Live,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "PAYPAL_MODE".to_string(),
                    format!("expected 'sandbox' or 'live', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            client_id: get_optional_env(var, "PAYPAL_CLIENT_ID"),
            client_secret: get_optional_env(var, "PAYPAL_CLIENT_SECRET").map(SecretString::from),
            mode,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env<F>(var: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret<F>(var: &F, key: &str) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get_required_env(var, key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env<F>(var: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key).filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default<F>(var: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(var, key).unwrap_or_else(|| default.to_string())
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

/// Parse a lifetime such as `30s`, `15m`, `12h` or `7d`. A bare number is seconds.
///
/// # Errors
///
/// Returns a message when the value is malformed, zero, or out of range.
pub fn parse_duration(raw: &str) -> Result<TimeDelta, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let (digits, unit_seconds) = if let Some(d) = raw.strip_suffix('s') {
        (d, 1)
    } else if let Some(d) = raw.strip_suffix('m') {
        (d, 60)
    } else if let Some(d) = raw.strip_suffix('h') {
        (d, 3_600)
    } else if let Some(d) = raw.strip_suffix('d') {
        (d, 86_400)
    } else {
        (raw, 1)
    };

    let value = digits
        .parse::<i64>()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    if value <= 0 {
        return Err(format!("duration must be positive, got '{raw}'"));
    }

    value
        .checked_mul(unit_seconds)
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| format!("duration '{raw}' is out of range"))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a signing secret.
fn get_validated_secret<F>(var: &F, key: &str) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get_required_secret(var, key)?;
    validate_secret_length(&value, key)?;
    validate_secret_strength(value.expose_secret(), key)?;
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ACCESS: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6v";
    const REFRESH: &str = "Zq8%Lw1!Rt6@Vy3#Hn0&Jp5*Md2^Kc9x";

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/emporium".to_string()),
            ("JWT_SECRET", ACCESS.to_string()),
            ("JWT_REFRESH_SECRET", REFRESH.to_string()),
            ("STRIPE_SECRET_KEY", "sk_test_123".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<ApiConfig, ConfigError> {
        ApiConfig::from_source(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.jwt.access_ttl, TimeDelta::days(7));
        assert_eq!(config.jwt.refresh_ttl, TimeDelta::days(30));
        assert!(config.email.is_none());
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.paypal.mode, PaypalMode::Sandbox);
    }

    #[test]
    fn test_missing_required() {
        let mut env = base_env();
        env.remove("STRIPE_SECRET_KEY");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STRIPE_SECRET_KEY"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut env = base_env();
        env.insert("JWT_SECRET", "aB3$xY9!".to_string());
        assert!(matches!(
            load(&env).unwrap_err(),
            ConfigError::InsecureSecret(..)
        ));
    }

    #[test]
    fn test_frontend_link_uses_first_origin() {
        let mut env = base_env();
        env.insert(
            "CORS_ORIGIN",
            "https://shop.example.org/, https://admin.example.org".to_string(),
        );
        let config = load(&env).unwrap();
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(
            config.frontend_link("/reset-password?token=abc"),
            "https://shop.example.org/reset-password?token=abc"
        );
    }

    #[test]
    fn test_email_from_defaults_to_user() {
        let mut env = base_env();
        env.insert("EMAIL_HOST", "smtp.mailer.test".to_string());
        env.insert("EMAIL_USER", "store@mailer.test".to_string());
        let email = load(&env).unwrap().email.unwrap();
        assert_eq!(email.port, 587);
        assert_eq!(email.from, "store@mailer.test");
    }

    #[test]
    fn test_invalid_paypal_mode() {
        let mut env = base_env();
        env.insert("PAYPAL_MODE", "production".to_string());
        assert!(matches!(
            load(&env).unwrap_err(),
            ConfigError::InvalidEnvVar(ref k, _) if k == "PAYPAL_MODE"
        ));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("45s").unwrap(), TimeDelta::seconds(45));
        assert_eq!(parse_duration("15m").unwrap(), TimeDelta::minutes(15));
        assert_eq!(parse_duration("12h").unwrap(), TimeDelta::hours(12));
        assert_eq!(parse_duration("7d").unwrap(), TimeDelta::days(7));
        assert_eq!(parse_duration("3600").unwrap(), TimeDelta::hours(1));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("0d").is_err());
        assert!(parse_duration("-5m").is_err());
        assert!(parse_duration("7w").is_err());
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-jwt-secret-here", "T").is_err());
        assert!(validate_secret_strength("changeme123", "T").is_err());
        assert!(validate_secret_strength(&"a".repeat(40), "T").is_err());
        assert!(validate_secret_strength(ACCESS, "T").is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(ACCESS));
        assert!(!debug_output.contains("sk_test_123"));
        assert!(!debug_output.contains("postgres://localhost/emporium"));
    }
}
