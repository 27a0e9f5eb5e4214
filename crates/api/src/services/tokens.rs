//! Access/refresh JWTs and opaque one-time tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with distinct secrets.
//! Password reset and email verification links carry opaque random tokens;
//! only their SHA-256 digest is stored.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use emporium_core::{UserId, UserRole};

use crate::config::JwtConfig;
use crate::models::user::User;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature, format or claims are invalid.
    #[error("invalid token")]
    Invalid,

    /// The token is past its `exp`.
    #[error("token expired")]
    Expired,

    /// Signing failed.
    #[error("token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    /// Random nonce; set on refresh tokens so each one is unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// An access/refresh token pair as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing and verification keys for both token kinds.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let access = config.access_secret.expose_secret().as_bytes();
        let refresh = config.refresh_secret.expose_secret().as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Lifetime of refresh tokens, also used for the stored row's expiry.
    #[must_use]
    pub const fn refresh_ttl(&self) -> TimeDelta {
        self.refresh_ttl
    }

    /// Issue a fresh access/refresh pair for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let now = Utc::now().timestamp();
        let access = claims_for(user, now, self.access_ttl, None);
        let refresh = claims_for(user, now, self.refresh_ttl, Some(generate_opaque_token()));

        Ok(TokenPair {
            access_token: sign(&access, &self.access_encoding)?,
            refresh_token: sign(&refresh, &self.refresh_encoding)?,
        })
    }

    /// Verify an access token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` past `exp`, `TokenError::Invalid` otherwise.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.access_decoding)
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` past `exp`, `TokenError::Invalid` otherwise.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.refresh_decoding)
    }
}

fn claims_for(user: &User, now: i64, ttl: TimeDelta, jti: Option<String>) -> Claims {
    Claims {
        user_id: user.id,
        email: user.email.as_str().to_string(),
        role: user.role,
        iat: now,
        exp: now + ttl.num_seconds(),
        jti,
    }
}

fn sign(claims: &Claims, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(TokenError::Encoding)
}

fn verify(token: &str, key: &DecodingKey) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(token, key, &validation)?;
    Ok(data.claims)
}

/// Generate a random opaque token: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_opaque_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// SHA-256 hex digest of a token, the form tokens are stored in.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    use emporium_core::Email;

    fn keys(access_ttl: TimeDelta) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            access_secret: SecretString::from("k7#Qp2!vR9@xL4$mN8^wT1&zB6*cF3hJ"),
            refresh_secret: SecretString::from("Z5%gH8!rK2@pW7#tY4$uE9^iO1&aS6*d"),
            access_ttl,
            refresh_ttl: TimeDelta::days(30),
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(),
            email: Email::parse("shopper@example.com").unwrap(),
            first_name: "Sam".to_string(),
            last_name: "Shopper".to_string(),
            phone: None,
            avatar: None,
            role: UserRole::Customer,
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify_access() {
        let keys = keys(TimeDelta::days(7));
        let user = user();
        let pair = keys.issue_pair(&user).unwrap();

        let claims = keys.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, "shopper@example.com");
        assert_eq!(claims.role, UserRole::Customer);
        assert_eq!(claims.exp - claims.iat, TimeDelta::days(7).num_seconds());
        assert!(claims.jti.is_none());
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let keys = keys(TimeDelta::days(7));
        let pair = keys.issue_pair(&user()).unwrap();

        assert!(matches!(
            keys.verify_refresh(&pair.access_token),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            keys.verify_access(&pair.refresh_token),
            Err(TokenError::Invalid)
        ));
        assert!(keys.verify_refresh(&pair.refresh_token).unwrap().jti.is_some());
    }

    #[test]
    fn test_refresh_tokens_differ_within_same_second() {
        let keys = keys(TimeDelta::days(7));
        let user = user();
        let a = keys.issue_pair(&user).unwrap();
        let b = keys.issue_pair(&user).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn test_expired_token_is_reported() {
        let keys = keys(TimeDelta::seconds(-10));
        let pair = keys.issue_pair(&user()).unwrap();
        assert!(matches!(
            keys.verify_access(&pair.access_token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let keys = keys(TimeDelta::days(7));
        assert!(matches!(
            keys.verify_access("not.a.jwt"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_opaque_token_and_digest() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_opaque_token());

        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(token_digest(&token), token);
    }
}
