//! Bearer-token authentication extractors.
//!
//! Each extractor reads `Authorization: Bearer <jwt>`, verifies it as an
//! access token and loads the user from the database, so a deleted account
//! is rejected even while its token is still valid.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::users::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::user::User;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub User);

/// Extractor that requires a user with the `ADMIN` or `SUPER_ADMIN` role.
pub struct RequireAdmin(pub User);

/// Extractor that requires a user with the `SUPER_ADMIN` role.
pub struct RequireSuperAdmin(pub User);

/// Extractor that resolves the user when a valid token is present.
///
/// Missing, malformed or expired tokens are ignored rather than rejected.
pub struct OptionalAuth(pub Option<User>);

/// Pull the token out of an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(parts)
        .ok_or_else(|| AppError::unauthorized("UNAUTHORIZED", "Access token required"))?;

    let claims = state.jwt().verify_access(token)?;
    let user = UserRepository::new(state.pool())
        .get_by_id(claims.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("USER_NOT_FOUND", "User not found"))?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

fn insufficient_permissions() -> AppError {
    AppError::Forbidden("Insufficient permissions".to_string())
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, role = %user.role, path = %parts.uri.path(), "Admin access denied");
            return Err(insufficient_permissions());
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.role.is_super_admin() {
            tracing::warn!(user_id = %user.id, role = %user.role, path = %parts.uri.path(), "Super admin access denied");
            return Err(insufficient_permissions());
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(Self(None));
        }
        Ok(Self(authenticate(parts, state).await.ok()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
