//! Stored token digests: refresh tokens and one-time links.
//!
//! Only the SHA-256 hex digest of a token is persisted. Lookups hash the
//! presented token and compare digests.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::{TokenId, UserId};

use super::RepositoryError;

/// Purpose of a one-time token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneTimeTokenKind {
    PasswordReset,
    EmailVerification,
}

impl OneTimeTokenKind {
    const fn table(self) -> &'static str {
        match self {
            Self::PasswordReset => "password_reset_tokens",
            Self::EmailVerification => "email_verification_tokens",
        }
    }
}

/// A stored token row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Repository for refresh and one-time tokens.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Refresh tokens
    // =========================================================================

    /// Store a refresh token digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_refresh(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(TokenId::new())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;
        Ok(())
    }

    /// Find an unexpired refresh token by digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_refresh(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredToken>, RepositoryError> {
        let row = sqlx::query_as::<_, StoredToken>(
            "SELECT id, user_id, expires_at FROM refresh_tokens WHERE token_hash = $1 AND expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Replace a stored refresh token with its successor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row was already rotated or revoked.
    pub async fn rotate_refresh(
        &self,
        id: TokenId,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET token_hash = $2, expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(new_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Revoke every refresh token of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn revoke_all_refresh(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // One-time tokens
    // =========================================================================

    /// Store a one-time token digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_one_time(
        &self,
        kind: OneTimeTokenKind,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (id, user_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(TokenId::new())
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_write)?;
        Ok(())
    }

    /// Delete and return an unexpired one-time token. Each token works once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_one_time(
        &self,
        kind: OneTimeTokenKind,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredToken>, RepositoryError> {
        let sql = format!(
            "DELETE FROM {} WHERE token_hash = $1 AND expires_at > $2 RETURNING id, user_id, expires_at",
            kind.table()
        );
        let row = sqlx::query_as::<_, StoredToken>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Drop every outstanding token of a kind for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_one_time_for_user(
        &self,
        kind: OneTimeTokenKind,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE user_id = $1", kind.table());
        sqlx::query(&sql).bind(user_id).execute(self.pool).await?;
        Ok(())
    }
}
