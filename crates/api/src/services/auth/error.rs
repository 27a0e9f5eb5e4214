//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::MailError;
use crate::services::tokens::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] emporium_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Current password did not match on a password change.
    #[error("current password is incorrect")]
    InvalidPassword,

    /// Refresh token unknown, expired, rotated or badly signed.
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Password reset token unknown or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Email verification token unknown or expired.
    #[error("invalid or expired verification token")]
    InvalidVerificationToken,

    /// A required email could not be delivered.
    #[error("email delivery failed: {0}")]
    EmailDelivery(#[source] MailError),

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
