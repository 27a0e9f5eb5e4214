//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. An `AppError` resolves to a
//! status code, a machine-readable code and a public message, rendered as
//! `{"success": false, "error": {"message", "code"}}`. Server errors are
//! captured to Sentry before responding and their details never reach the
//! client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::payments::PaymentError;
use crate::services::tokens::TokenError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Access token rejected.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Order placement or cancellation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment provider operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    /// Request rejected by a business rule.
    #[error("Bad request: {message}")]
    BadRequest { code: &'static str, message: String },

    /// Request body, query or path failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {message}")]
    Unauthorized { code: &'static str, message: String },

    /// Caller lacks the required role or ownership.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists.
    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },
}

impl AppError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Status, error code and client-facing message.
    #[must_use]
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Database(err) => repository_parts(err),
            Self::Auth(err) => auth_parts(err),
            Self::Token(err) => token_parts(err),
            Self::Checkout(err) => checkout_parts(err),
            Self::Payment(err) => payment_parts(err),
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message.clone()),
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message.clone()),
            Self::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            }
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, code, message.clone())
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, "FORBIDDEN", message.clone()),
            Self::Conflict { code, message } => (StatusCode::CONFLICT, code, message.clone()),
        }
    }
}

fn internal(code: &'static str) -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        code,
        INTERNAL_MESSAGE.to_string(),
    )
}

fn repository_parts(err: &RepositoryError) -> (StatusCode, &'static str, String) {
    match err {
        RepositoryError::Conflict(field) => (
            StatusCode::CONFLICT,
            "DUPLICATE_ENTRY",
            format!("{field} already exists"),
        ),
        RepositoryError::NotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Record not found".to_string(),
        ),
        RepositoryError::ForeignKey(_) => (
            StatusCode::BAD_REQUEST,
            "FOREIGN_KEY_CONSTRAINT",
            "Invalid reference to related record".to_string(),
        ),
        RepositoryError::Database(_) => internal("DATABASE_ERROR"),
    }
}

fn token_parts(err: &TokenError) -> (StatusCode, &'static str, String) {
    match err {
        TokenError::Invalid => (
            StatusCode::UNAUTHORIZED,
            "INVALID_TOKEN",
            "Invalid token".to_string(),
        ),
        TokenError::Expired => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_EXPIRED",
            "Token expired".to_string(),
        ),
        TokenError::Encoding(_) => internal("INTERNAL_ERROR"),
    }
}

fn auth_parts(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        AuthError::InvalidEmail(_) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Invalid email address".to_string(),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid email or password".to_string(),
        ),
        AuthError::UserNotFound => (
            StatusCode::NOT_FOUND,
            "USER_NOT_FOUND",
            "User not found".to_string(),
        ),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "USER_EXISTS",
            "User already exists with this email".to_string(),
        ),
        AuthError::InvalidPassword => (
            StatusCode::BAD_REQUEST,
            "INVALID_PASSWORD",
            "Current password is incorrect".to_string(),
        ),
        AuthError::InvalidRefreshToken => (
            StatusCode::UNAUTHORIZED,
            "INVALID_REFRESH_TOKEN",
            "Invalid or expired refresh token".to_string(),
        ),
        AuthError::InvalidResetToken => (
            StatusCode::BAD_REQUEST,
            "INVALID_RESET_TOKEN",
            "Invalid or expired reset token".to_string(),
        ),
        AuthError::InvalidVerificationToken => (
            StatusCode::BAD_REQUEST,
            "INVALID_VERIFICATION_TOKEN",
            "Invalid or expired verification token".to_string(),
        ),
        AuthError::EmailDelivery(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "EMAIL_SEND_FAILED",
            "Failed to send email".to_string(),
        ),
        AuthError::Token(err) => token_parts(err),
        AuthError::Repository(err) => repository_parts(err),
        AuthError::PasswordHash => internal("INTERNAL_ERROR"),
    }
}

fn checkout_parts(err: &CheckoutError) -> (StatusCode, &'static str, String) {
    match err {
        CheckoutError::EmptyCart => (
            StatusCode::BAD_REQUEST,
            "EMPTY_CART",
            "Cart is empty".to_string(),
        ),
        CheckoutError::ProductUnavailable(name) => (
            StatusCode::BAD_REQUEST,
            "PRODUCT_UNAVAILABLE",
            format!("{name} is no longer available"),
        ),
        CheckoutError::InsufficientInventory(name) => (
            StatusCode::BAD_REQUEST,
            "INSUFFICIENT_INVENTORY",
            format!("Insufficient inventory for {name}"),
        ),
        CheckoutError::OrderNotFound => (
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            "Order not found".to_string(),
        ),
        CheckoutError::NotCancellable(_) => (
            StatusCode::BAD_REQUEST,
            "ORDER_CANNOT_BE_CANCELLED",
            "Order cannot be cancelled".to_string(),
        ),
        CheckoutError::Repository(err) => repository_parts(err),
    }
}

fn payment_parts(err: &PaymentError) -> (StatusCode, &'static str, String) {
    match err {
        PaymentError::IntentCreation(_) => (
            StatusCode::BAD_GATEWAY,
            "PAYMENT_INTENT_FAILED",
            "Failed to create payment intent".to_string(),
        ),
        PaymentError::IntentRetrieval(_) => (
            StatusCode::BAD_GATEWAY,
            "PAYMENT_CONFIRMATION_FAILED",
            "Failed to confirm payment".to_string(),
        ),
        PaymentError::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "PAYMENT_PROVIDER_ERROR",
            "Payment provider error".to_string(),
        ),
        PaymentError::NotCompleted(_) => (
            StatusCode::BAD_REQUEST,
            "PAYMENT_NOT_COMPLETED",
            "Payment not completed".to_string(),
        ),
        PaymentError::InvalidIntentId => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Invalid payment intent ID".to_string(),
        ),
        PaymentError::NotOwner => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Payment intent does not belong to this account".to_string(),
        ),
        PaymentError::InvalidAmount => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Amount must be a positive number".to_string(),
        ),
        PaymentError::InvalidSignature | PaymentError::InvalidPayload(_) => (
            StatusCode::BAD_REQUEST,
            "WEBHOOK_ERROR",
            "Webhook Error".to_string(),
        ),
        PaymentError::NotConfigured => internal("PAYMENT_NOT_CONFIGURED"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                code,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, code, status = status.as_u16(), "Request rejected");
        }

        let body = json!({
            "success": false,
            "error": {
                "message": message,
                "code": code,
            },
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emporium_core::OrderStatus;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    fn code_of(err: &AppError) -> &'static str {
        err.parts().1
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::not_found("PRODUCT_NOT_FOUND", "Product not found");
        assert_eq!(err.to_string(), "Not found: Product not found");

        let err = AppError::validation("quantity must be at least 1");
        assert_eq!(err.to_string(), "Validation error: quantity must be at least 1");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::not_found("NOT_FOUND", "x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::unauthorized("UNAUTHORIZED", "x")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::bad_request("EMPTY_CART", "x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Forbidden("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::conflict("REVIEW_EXISTS", "x")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::from(PaymentError::NotConfigured)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_mapping() {
        let err = AppError::from(RepositoryError::Conflict("sku".to_string()));
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "DUPLICATE_ENTRY");
        assert_eq!(message, "sku already exists");

        let err = AppError::from(RepositoryError::ForeignKey("fk".to_string()));
        assert_eq!(err.parts().0, StatusCode::BAD_REQUEST);
        assert_eq!(code_of(&err), "FOREIGN_KEY_CONSTRAINT");

        let err = AppError::from(RepositoryError::NotFound);
        assert_eq!(code_of(&err), "NOT_FOUND");

        let err = AppError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "DATABASE_ERROR");
        assert_eq!(message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_token_mapping() {
        assert_eq!(code_of(&AppError::from(TokenError::Invalid)), "INVALID_TOKEN");
        assert_eq!(code_of(&AppError::from(TokenError::Expired)), "TOKEN_EXPIRED");
        assert_eq!(
            AppError::from(TokenError::Expired).parts().0,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_auth_mapping() {
        let err = AppError::from(AuthError::InvalidCredentials);
        assert_eq!(err.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(code_of(&err), "INVALID_CREDENTIALS");

        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).parts().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            code_of(&AppError::from(AuthError::WeakPassword("short".to_string()))),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            code_of(&AppError::from(AuthError::InvalidResetToken)),
            "INVALID_RESET_TOKEN"
        );
        // Nested errors keep their own mapping
        assert_eq!(
            code_of(&AppError::from(AuthError::Token(TokenError::Expired))),
            "TOKEN_EXPIRED"
        );
    }

    #[test]
    fn test_checkout_and_payment_mapping() {
        assert_eq!(
            code_of(&AppError::from(CheckoutError::NotCancellable(OrderStatus::Shipped))),
            "ORDER_CANNOT_BE_CANCELLED"
        );
        let err = AppError::from(CheckoutError::InsufficientInventory("Widget".to_string()));
        assert_eq!(err.parts().2, "Insufficient inventory for Widget");

        let err = AppError::from(PaymentError::IntentCreation("402".to_string()));
        assert_eq!(err.parts().0, StatusCode::BAD_GATEWAY);
        assert_eq!(code_of(&err), "PAYMENT_INTENT_FAILED");
        assert_eq!(
            code_of(&AppError::from(PaymentError::NotCompleted("processing".to_string()))),
            "PAYMENT_NOT_COMPLETED"
        );
        assert_eq!(
            AppError::from(PaymentError::NotOwner).parts().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            code_of(&AppError::from(PaymentError::InvalidIntentId)),
            "VALIDATION_ERROR"
        );
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response = AppError::not_found("ORDER_NOT_FOUND", "Order not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "ORDER_NOT_FOUND");
        assert_eq!(body["error"]["message"], "Order not found");
    }

    #[tokio::test]
    async fn test_internal_details_not_exposed() {
        let err = RepositoryError::Database(sqlx::Error::Protocol(
            "connection string leaked".to_string(),
        ));
        let response = AppError::from(err).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("leaked"));
        assert!(text.contains(INTERNAL_MESSAGE));
    }
}
