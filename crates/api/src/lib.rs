//! Emporium store API library.
//!
//! The binary in `main.rs` is a thin wrapper around [`build_router`]; keeping
//! the router here lets tests drive it in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::http::{HeaderName, HeaderValue, Method, Request, Response, header};
use axum::{Router, middleware::from_fn};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// CORS for the configured frontend origins. Credentials are allowed, so
/// origins, methods and headers are listed explicitly.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}

/// Build the full application router with its middleware stack.
///
/// Layer order, outermost first: Sentry, trace span, request ID, CORS,
/// security headers, then the per-group rate limiters inside the routes.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);

    routes::routes()
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::ApiConfig;

    const TEST_JWT_SECRET: &str = "k9Vq2Lx7Rb4Tz8Wm1Yc6Hd3Jf5Gn0Ps_Ae!Ui";
    const TEST_REFRESH_SECRET: &str = "Q3w8Er5Ty1Ui7Op4As9Df2Gh6Jk0Lz_Xc#Vb";

    /// Router over a pool that never connects; handlers that reach the
    /// database fail, everything in front of it works.
    fn test_router() -> Router {
        let config = ApiConfig::from_source(|key| match key {
            "DATABASE_URL" => Some("postgres://emporium@127.0.0.1:1/emporium".to_string()),
            "JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
            "JWT_REFRESH_SECRET" => Some(TEST_REFRESH_SECRET.to_string()),
            "STRIPE_SECRET_KEY" => Some("sk_test_emporium".to_string()),
            "STRIPE_WEBHOOK_SECRET" => Some("whsec_emporium_test".to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://emporium@127.0.0.1:1/emporium")
            .unwrap();
        build_router(AppState::new(config, pool).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = test_router().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_readiness_without_database_is_unavailable() {
        let response = test_router().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upstream_request_id_is_echoed() {
        let mut request = get("/health");
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-abc.123"));
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-abc.123");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = test_router().oneshot(get("/api/auth/me")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "Access token required");
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let mut request = get("/api/cart");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not-a-jwt"),
        );
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header("x-forwarded-for", "203.0.113.10")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\":"))
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_path_id_is_validation_error() {
        let response = test_router()
            .oneshot(get("/api/products/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Invalid ID format");
    }

    #[tokio::test]
    async fn test_out_of_range_page_is_rejected_before_database() {
        let response = test_router()
            .oneshot(get("/api/products?limit=500"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = test_router().oneshot(get("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_plain_400() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/payments/stripe/webhook")
            .header("x-forwarded-for", "203.0.113.11")
            .body(Body::from("{}"))
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Webhook Error");
    }
}
