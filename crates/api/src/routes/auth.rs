//! Account and session route handlers.
//!
//! ```text
//! POST /api/auth/register               - Create account, returns user + tokens
//! POST /api/auth/login                  - Password login, returns user + tokens
//! POST /api/auth/refresh-token          - Rotate refresh token
//! POST /api/auth/forgot-password        - Email a reset link
//! POST /api/auth/reset-password         - Set password with a reset token
//! GET  /api/auth/verify-email/{token}   - Confirm email address
//! POST /api/auth/logout                 - Revoke refresh tokens (auth)
//! GET  /api/auth/me                     - Current user (auth)
//! PUT  /api/auth/me                     - Update profile (auth)
//! PUT  /api/auth/change-password        - Change password (auth)
//! ```

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::user::{ProfileUpdate, User};
use crate::routes::extract::{ValidJson, ValidPath};
use crate::routes::response::ApiResponse;
use crate::routes::validation::{NAME_LENGTH, check_length, check_optional_length, check_phone, check_required};
use crate::services::auth::{AuthService, AuthSession, Registration};
use crate::services::tokens::TokenPair;
use crate::state::AppState;

/// Same answer whether or not the account exists.
const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, we have sent a password reset link.";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokensData {
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: User,
}

/// Register a new customer account.
#[instrument(skip_all, fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<Registration>,
) -> Result<ApiResponse<AuthSession>> {
    check_length("firstName", body.first_name.trim(), NAME_LENGTH)?;
    check_length("lastName", body.last_name.trim(), NAME_LENGTH)?;
    check_phone(body.phone.as_deref())?;

    let session = AuthService::new(&state).register(&body).await?;
    set_sentry_user(&session.user.id, Some(session.user.email.as_str()));

    Ok(ApiResponse::created(session).with_message("User registered successfully"))
}

/// Login with email and password.
#[instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<ApiResponse<AuthSession>> {
    check_required("password", &body.password)?;

    let session = AuthService::new(&state)
        .login(&body.email, &body.password)
        .await?;
    set_sentry_user(&session.user.id, Some(session.user.email.as_str()));
    tracing::info!(user_id = %session.user.id, "User logged in");

    Ok(ApiResponse::ok(session).with_message("Login successful"))
}

/// Exchange a refresh token for a new token pair.
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RefreshRequest>,
) -> Result<ApiResponse<TokensData>> {
    check_required("refreshToken", &body.refresh_token)?;

    let tokens = AuthService::new(&state).refresh(&body.refresh_token).await?;
    Ok(ApiResponse::ok(TokensData { tokens }).with_message("Tokens refreshed successfully"))
}

/// Revoke all refresh tokens of the caller.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<()>> {
    AuthService::new(&state).logout(user.id).await?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logout successful"))
}

/// Current user.
pub async fn me(RequireAuth(user): RequireAuth) -> ApiResponse<UserData> {
    ApiResponse::ok(UserData { user })
}

/// Update the caller's profile.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserData>> {
    let first_name = body.first_name.as_deref().map(str::trim);
    let last_name = body.last_name.as_deref().map(str::trim);
    check_optional_length("firstName", first_name, NAME_LENGTH)?;
    check_optional_length("lastName", last_name, NAME_LENGTH)?;
    check_phone(body.phone.as_deref())?;

    let update = ProfileUpdate {
        first_name: first_name.map(String::from),
        last_name: last_name.map(String::from),
        phone: body.phone,
        avatar: body.avatar,
    };
    let user = AuthService::new(&state).update_profile(user.id, &update).await?;

    Ok(ApiResponse::ok(UserData { user }).with_message("Profile updated successfully"))
}

/// Change the caller's password.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> Result<ApiResponse<()>> {
    check_required("currentPassword", &body.current_password)?;

    AuthService::new(&state)
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::message("Password changed successfully"))
}

/// Request a password reset email.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>> {
    check_required("email", &body.email)?;

    AuthService::new(&state).forgot_password(&body.email).await?;
    Ok(ApiResponse::message(FORGOT_PASSWORD_MESSAGE))
}

/// Set a new password with a reset token.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>> {
    check_required("token", &body.token)?;

    AuthService::new(&state)
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(ApiResponse::message("Password reset successfully"))
}

/// Confirm an email address from the link in the welcome email.
#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    ValidPath(token): ValidPath<String>,
) -> Result<ApiResponse<()>> {
    AuthService::new(&state).verify_email(&token).await?;
    Ok(ApiResponse::message("Email verified successfully"))
}
