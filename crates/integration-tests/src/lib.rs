//! Integration tests for the Emporium API.
//!
//! These tests drive a running server over HTTP and need:
//! - `API_BASE_URL` (default `http://localhost:5000`)
//! - `DATABASE_URL` for the tests that inspect or age stored tokens
//! - A migrated and seeded database (`emporium migrate && emporium seed`)
//!
//! They are `#[ignore]`d by default:
//!
//! ```bash
//! cargo test -p emporium-integration-tests -- --ignored
//! ```
//!
//! Each test registers its own throwaway customer, so runs do not interfere
//! with each other beyond sharing the seeded admin account.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Password used for every throwaway account.
pub const TEST_PASSWORD: &str = "Str0ng!Passw0rd";

/// Seeded admin credentials.
pub const ADMIN_EMAIL: &str = "admin@ecommerce.com";
pub const ADMIN_PASSWORD: &str = "Admin123!";

/// Base URL of the API under test.
#[must_use]
pub fn base_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Connect to the database behind the server under test.
pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPool::connect(&url).await.unwrap()
}

/// A unique, valid email address.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4().simple())
}

/// Parse a decimal field serialized as a string.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

/// Read a JSON body, asserting the expected status first.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body: Value = response.json().await.unwrap();
    assert_eq!(actual, status, "unexpected status, body: {body}");
    body
}

/// HTTP client bound to the API with an optional bearer token.
///
/// Each client presents its own `x-forwarded-for` address, so the per-IP
/// auth rate limit applies per client rather than to the whole test run.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
    token: Option<String>,
    client_ip: String,
}

/// An address from the 198.18.0.0/15 benchmarking range.
fn random_client_ip() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("198.{}.{}.{}", 18 + (bytes[0] & 1), bytes[1], bytes[2])
}

impl ApiClient {
    /// Anonymous client.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            http: Client::new(),
            base: base_url(),
            token: None,
            client_ip: random_client_ip(),
        }
    }

    /// Register a new customer and return a client signed in as them,
    /// along with the registration response body.
    pub async fn register() -> (Self, Value) {
        let anon = Self::anonymous();
        let email = unique_email();
        let response = anon
            .post(
                "/api/auth/register",
                &json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "firstName": "Integration",
                    "lastName": "Tester",
                }),
            )
            .await;
        let body = expect_json(response, StatusCode::CREATED).await;
        let token = body["data"]["tokens"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string();
        (anon.with_token(token), body)
    }

    /// Sign in with a password.
    pub async fn login(email: &str, password: &str) -> Self {
        let anon = Self::anonymous();
        let response = anon
            .post(
                "/api/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await;
        let body = expect_json(response, StatusCode::OK).await;
        let token = body["data"]["tokens"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string();
        anon.with_token(token)
    }

    /// Sign in as the seeded admin.
    pub async fn admin() -> Self {
        Self::login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// A fresh account raised to `SUPER_ADMIN` directly in the database.
    pub async fn super_admin() -> Self {
        let (_, body) = Self::register().await;
        let email = body["data"]["user"]["email"].as_str().unwrap();
        sqlx::query("UPDATE users SET role = 'SUPER_ADMIN' WHERE email = $1")
            .bind(email)
            .execute(&pool().await)
            .await
            .unwrap();
        Self::login(email, TEST_PASSWORD).await
    }

    #[must_use]
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{path}", self.base))
            .header("x-forwarded-for", &self.client_ip);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.request(reqwest::Method::GET, path)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.request(reqwest::Method::DELETE, path)
            .send()
            .await
            .unwrap()
    }
}

/// Create a fresh category and product as admin. Returns the product JSON.
pub async fn create_product(admin: &ApiClient, price: &str, inventory: i32) -> Value {
    let tag = Uuid::new_v4().simple().to_string();

    let response = admin
        .post(
            "/api/categories",
            &json!({ "name": format!("IT Category {tag}") }),
        )
        .await;
    let category = expect_json(response, StatusCode::CREATED).await;
    let category_id = category["data"]["category"]["id"].clone();

    let response = admin
        .post(
            "/api/products",
            &json!({
                "name": format!("IT Product {tag}"),
                "description": "Created by the integration tests",
                "price": price,
                "inventory": inventory,
                "sku": format!("IT-{tag}"),
                "categoryId": category_id,
                "images": ["https://example.com/integration.png"],
            }),
        )
        .await;
    let product = expect_json(response, StatusCode::CREATED).await;
    product["data"]["product"].clone()
}

/// A complete shipping address.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "street": "1 Infinite Loop",
        "city": "Cupertino",
        "state": "CA",
        "zipCode": "95014",
        "country": "US",
    })
}
