//! User management commands.
//!
//! ```bash
//! # Create an account directly (email is marked verified)
//! emporium user create -e ops@example.com -f Ada -l Lovelace -p 'S3cure!pass' -r admin
//!
//! # Change the role of an existing account
//! emporium user promote -e ops@example.com -r super_admin
//! ```
//!
//! Passwords go through the same policy and Argon2 hashing as registration.

use emporium_api::db::RepositoryError;
use emporium_api::db::users::UserRepository;
use emporium_api::models::user::{AdminUserUpdate, NewUser};
use emporium_api::services::auth::{hash_password, validate_password};
use emporium_core::{Email, UserId, UserRole};

use super::{CommandError, connect};

/// Accepts `super_admin` as well as `SUPER_ADMIN`.
fn parse_role(role: &str) -> Result<UserRole, CommandError> {
    role.to_ascii_uppercase()
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))
}

/// Create a new user.
///
/// # Errors
///
/// Returns an error if the role, email or password is invalid, the email is
/// taken, or the database is unreachable.
pub async fn create(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    role: &str,
) -> Result<UserId, CommandError> {
    let role = parse_role(role)?;
    let email = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);

    let new = NewUser {
        email: email.clone(),
        password_hash,
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        phone: None,
        role,
        email_verified: true,
    };

    let user = UserRepository::new(&pool)
        .create(&new)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CommandError::UserExists(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}

/// Set the role of an existing user.
///
/// # Errors
///
/// Returns an error if the role or email is invalid, no such user exists, or
/// the database is unreachable.
pub async fn promote(email: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_role(role)?;
    let parsed = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(email.to_owned()))?;

    let update = AdminUserUpdate {
        role: Some(role),
        ..AdminUserUpdate::default()
    };
    let user = users.admin_update(user.id, &update).await?;

    tracing::info!("{} is now {}", user.email, user.role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_accepts_lowercase() {
        assert!(matches!(parse_role("super_admin"), Ok(UserRole::SuperAdmin)));
        assert!(matches!(parse_role("ADMIN"), Ok(UserRole::Admin)));
        assert!(matches!(parse_role("customer"), Ok(UserRole::Customer)));
    }

    #[test]
    fn test_parse_role_rejects_unknown() {
        assert!(matches!(
            parse_role("owner"),
            Err(CommandError::InvalidRole(r)) if r == "owner"
        ));
    }
}
