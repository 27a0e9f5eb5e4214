//! Database migration command.
//!
//! ```bash
//! emporium migrate
//! ```
//!
//! Applies every pending migration from `crates/api/migrations/` to the
//! database named by `DATABASE_URL`. The API server never migrates on
//! startup, so run this after each deploy.

use super::{CommandError, connect};

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
