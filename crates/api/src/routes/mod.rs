//! HTTP route handlers for the store API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database reachable)
//!
//! /api/auth                    - Accounts and sessions (strict rate limit)
//! /api/products                - Catalog, reviews, admin product CRUD
//! /api/categories              - Category tree, admin category CRUD
//! /api/cart                    - Shopping cart (auth)
//! /api/orders                  - Checkout and order history (auth)
//! /api/users                   - Address book, admin user management
//! /api/payments                - Stripe and PayPal
//! /api/admin                   - Dashboard and listings (admin)
//! ```
//!
//! Each handler module documents its own routes.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod extract;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod response;
pub mod users;
pub mod validation;

use axum::{
    Router,
    http::Uri,
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).put(auth::update_profile))
        .route("/change-password", put(auth::change_password))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(products::list_products).post(products::create_product),
        )
        .route("/search", get(products::search_products))
        .route("/featured", get(products::featured_products))
        .route("/recommendations", get(products::recommendations))
        .route(
            "/reviews/{review_id}",
            put(products::update_review).delete(products::delete_review),
        )
        .route(
            "/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/{id}/reviews",
            get(products::product_reviews).post(products::create_review),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/{id}/products", get(categories::category_products))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get_cart).delete(cart::clear_cart))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/admin/all", get(orders::list_all_orders))
        .route("/{id}", get(orders::get_order))
        .route("/{id}/cancel", put(orders::cancel_order))
        .route("/{id}/status", put(orders::update_order_status))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(users::list_addresses).post(users::create_address),
        )
        .route(
            "/addresses/{id}",
            put(users::update_address).delete(users::delete_address),
        )
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/stripe/create-intent", post(payments::create_intent))
        .route("/stripe/confirm", post(payments::confirm_payment))
        .route("/stripe/webhook", post(payments::stripe_webhook))
        .route("/paypal/create-order", post(payments::paypal_create_order))
        .route("/paypal/capture", post(payments::paypal_capture))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/analytics", get(admin::analytics))
        .route("/ledger", get(admin::ledger))
        .route("/users", get(admin::users))
        .route("/orders", get(admin::orders))
        .route("/products", get(admin::products))
}

/// JSON 404 for unknown paths.
async fn not_found(uri: Uri) -> AppError {
    AppError::not_found("NOT_FOUND", format!("Route {} not found", uri.path()))
}

/// Create all routes for the API.
///
/// Auth endpoints get the strict rate limiter; everything else under `/api`
/// shares the relaxed one. Health checks are not limited.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/users", user_routes())
        .nest("/payments", payment_routes())
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes().layer(auth_rate_limiter()))
        .nest("/api", api)
        .fallback(not_found)
}
