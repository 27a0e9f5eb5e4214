//! Authentication service.
//!
//! Password accounts with JWT access tokens and rotated refresh tokens,
//! plus password reset and email verification links.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{Email, UserId, UserRole};

use crate::config::ApiConfig;
use crate::db::RepositoryError;
use crate::db::tokens::{OneTimeTokenKind, TokenRepository};
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, ProfileUpdate, User};
use crate::services::email::Mailer;
use crate::services::tokens::{JwtKeys, TokenPair, generate_opaque_token, token_digest};
use crate::state::AppState;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length, in characters.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// How long a password reset link stays valid.
pub const PASSWORD_RESET_TTL: TimeDelta = TimeDelta::hours(1);

/// How long an email verification link stays valid.
pub const EMAIL_VERIFICATION_TTL: TimeDelta = TimeDelta::hours(24);

/// Hash checked when no account matches a login, so unknown emails take as
/// long to reject as wrong passwords.
static UNKNOWN_ACCOUNT_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password(&generate_opaque_token()).ok());

/// Sign-up details.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// A signed-in user with a fresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
}

/// Authentication service.
///
/// Handles registration, login, token refresh and password recovery.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: TokenRepository<'a>,
    keys: &'a JwtKeys,
    mailer: &'a Mailer,
    config: &'a ApiConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            users: UserRepository::new(state.pool()),
            tokens: TokenRepository::new(state.pool()),
            keys: state.jwt(),
            mailer: state.mailer(),
            config: state.config(),
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Register a new customer account and sign it in.
    ///
    /// The welcome email is best-effort; a delivery failure is logged only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let new_user = NewUser {
            email,
            password_hash: hash_password(&registration.password)?,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            phone: registration.phone.clone(),
            role: UserRole::Customer,
            email_verified: false,
        };

        let user = self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        let session = self.start_session(user).await?;

        let verification_token = generate_opaque_token();
        self.tokens
            .insert_one_time(
                OneTimeTokenKind::EmailVerification,
                session.user.id,
                &token_digest(&verification_token),
                Utc::now() + EMAIL_VERIFICATION_TTL,
            )
            .await?;

        let verification_url = self
            .config
            .frontend_link(&format!("verify-email/{verification_token}"));
        if let Err(e) = self
            .mailer
            .send_welcome(&session.user.email, &session.user.first_name, &verification_url)
            .await
        {
            tracing::warn!(user_id = %session.user.id, error = %e, "Failed to send welcome email");
        }

        tracing::info!(user_id = %session.user.id, "User registered");
        Ok(session)
    }

    /// Login with email and password.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some(credentials) = self.users.get_credentials_by_email(&email).await? else {
            return Err(reject_unknown_account(password));
        };

        verify_password(password, &credentials.password_hash)?;

        self.start_session(credentials.user).await
    }

    /// Exchange a refresh token for a new pair, rotating the stored token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` if the token is badly signed,
    /// expired, unknown or already rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.keys
            .verify_refresh(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let now = Utc::now();
        let stored = self
            .tokens
            .find_refresh(&token_digest(refresh_token), now)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let user = self
            .users
            .get_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let pair = self.keys.issue_pair(&user)?;
        self.tokens
            .rotate_refresh(
                stored.id,
                &token_digest(&pair.refresh_token),
                now + self.keys.refresh_ttl(),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidRefreshToken,
                other => AuthError::Repository(other),
            })?;

        Ok(pair)
    }

    /// Revoke every refresh token of a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        let revoked = self.tokens.revoke_all_refresh(user_id).await?;
        tracing::debug!(user_id = %user_id, revoked, "Refresh tokens revoked");
        Ok(())
    }

    async fn start_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let tokens = self.keys.issue_pair(&user)?;
        self.tokens
            .insert_refresh(
                user.id,
                &token_digest(&tokens.refresh_token),
                Utc::now() + self.keys.refresh_ttl(),
            )
            .await?;
        Ok(AuthSession { user, tokens })
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the caller's own profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, AuthError> {
        self.users
            .update_profile(user_id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    // =========================================================================
    // Passwords
    // =========================================================================

    /// Change the password after checking the current one. Signs out every
    /// other session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidPassword` if the current password is wrong.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let credentials = self
            .users
            .get_credentials_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(current_password, &credentials.password_hash)
            .map_err(|_| AuthError::InvalidPassword)?;
        validate_password(new_password)?;

        self.users
            .update_password(user_id, &hash_password(new_password)?)
            .await?;
        self.tokens.revoke_all_refresh(user_id).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Email a password reset link if the account exists.
    ///
    /// Succeeds silently for unknown emails.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailDelivery` if the reset email cannot be sent.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(());
        };

        self.tokens
            .delete_one_time_for_user(OneTimeTokenKind::PasswordReset, user.id)
            .await?;

        let token = generate_opaque_token();
        self.tokens
            .insert_one_time(
                OneTimeTokenKind::PasswordReset,
                user.id,
                &token_digest(&token),
                Utc::now() + PASSWORD_RESET_TTL,
            )
            .await?;

        let reset_url = self.config.frontend_link(&format!("reset-password/{token}"));
        self.mailer
            .send_password_reset(&user.email, &user.first_name, &reset_url)
            .await
            .map_err(AuthError::EmailDelivery)?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Set a new password using a reset token. Signs out every session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let stored = self
            .tokens
            .consume_one_time(OneTimeTokenKind::PasswordReset, &token_digest(token), Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        self.users
            .update_password(stored.user_id, &hash_password(new_password)?)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidResetToken,
                other => AuthError::Repository(other),
            })?;
        self.tokens.revoke_all_refresh(stored.user_id).await?;

        tracing::info!(user_id = %stored.user_id, "Password reset");
        Ok(())
    }

    /// Mark an email address verified using a verification token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidVerificationToken` if the token is unknown or expired.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let stored = self
            .tokens
            .consume_one_time(
                OneTimeTokenKind::EmailVerification,
                &token_digest(token),
                Utc::now(),
            )
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        self.users.mark_email_verified(stored.user_id).await?;
        Ok(())
    }
}

/// Check a password against the account password policy.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first unmet rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters long"
        )));
    }

    let has_lower = password.chars().any(char::is_lowercase);
    let has_upper = password.chars().any(char::is_uppercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(AuthError::WeakPassword(
            "Password must contain at least one lowercase letter, one uppercase letter, \
             one number, and one special character"
                .to_string(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Spend the same hashing work as a real check, then fail.
fn reject_unknown_account(password: &str) -> AuthError {
    if let Some(hash) = UNKNOWN_ACCOUNT_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
