//! Saved address repository.
//!
//! A partial unique index allows one default address per user, so writes
//! that set `is_default` first clear the flag on the user's other addresses
//! inside the same transaction.

use sqlx::{PgConnection, PgPool};

use emporium_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, AddressInput, AddressUpdate};

async fn clear_default(
    conn: &mut PgConnection,
    user_id: UserId,
    keep: Option<AddressId>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE addresses
        SET is_default = FALSE, updated_at = NOW()
        WHERE user_id = $1 AND is_default AND ($2::uuid IS NULL OR id <> $2)
        ",
    )
    .bind(user_id)
    .bind(keep)
    .execute(conn)
    .await?;
    Ok(())
}

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, default first, then newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an address only if the user owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: AddressId,
        user_id: UserId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, user_id, None).await?;
        }

        let address = sqlx::query_as::<_, Address>(
            r"
            INSERT INTO addresses (id, user_id, street, city, state, zip_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(AddressId::new())
        .bind(user_id)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip_code)
        .bind(&input.country)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Update one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn update(
        &self,
        id: AddressId,
        user_id: UserId,
        update: &AddressUpdate,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if update.is_default == Some(true) {
            clear_default(&mut tx, user_id, Some(id)).await?;
        }

        let address = sqlx::query_as::<_, Address>(
            r"
            UPDATE addresses
            SET street = COALESCE($3, street),
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                zip_code = COALESCE($6, zip_code),
                country = COALESCE($7, country),
                is_default = COALESCE($8, is_default),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&update.street)
        .bind(&update.city)
        .bind(&update.state)
        .bind(&update.zip_code)
        .bind(&update.country)
        .bind(update.is_default)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn delete(&self, id: AddressId, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
