//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository error from the API crate.
    #[error("Repository error: {0}")]
    Repository(#[from] emporium_api::db::RepositoryError),

    /// Password rejected or could not be hashed.
    #[error("Password error: {0}")]
    Password(#[from] emporium_api::services::auth::AuthError),

    /// Role string did not name a role.
    #[error("Invalid role: {0}. Valid roles: customer, admin, super_admin")]
    InvalidRole(String),

    /// Email failed validation.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// A user with this email already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// No user with this email.
    #[error("No user with email: {0}")]
    UserNotFound(String),
}

/// Load `.env` and connect to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(emporium_api::db::create_pool(&database_url).await?)
}
