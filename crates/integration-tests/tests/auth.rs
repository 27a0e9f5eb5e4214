//! Login failure and password-reset token lifetime.
//!
//! Requires a running API server and `DATABASE_URL`.
//! Run with: cargo test -p emporium-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use emporium_api::services::tokens::{generate_opaque_token, token_digest};
use emporium_integration_tests::{ApiClient, TEST_PASSWORD, expect_json, pool, unique_email};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
    let (_, registered) = ApiClient::register().await;
    let email = registered["data"]["user"]["email"].as_str().unwrap();
    let anon = ApiClient::anonymous();

    let wrong_password = anon
        .post(
            "/api/auth/login",
            &json!({ "email": email, "password": "Wr0ng!Password" }),
        )
        .await;
    let wrong_password = expect_json(wrong_password, StatusCode::UNAUTHORIZED).await;

    let unknown_email = anon
        .post(
            "/api/auth/login",
            &json!({ "email": unique_email(), "password": TEST_PASSWORD }),
        )
        .await;
    let unknown_email = expect_json(unknown_email, StatusCode::UNAUTHORIZED).await;

    assert_eq!(wrong_password["success"], false);
    assert_eq!(wrong_password["error"], unknown_email["error"]);
    assert_eq!(wrong_password["error"]["message"], "Invalid email or password");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_forgot_password_does_not_reveal_accounts() {
    let (_, registered) = ApiClient::register().await;
    let email = registered["data"]["user"]["email"].as_str().unwrap();
    let anon = ApiClient::anonymous();

    let known = anon
        .post("/api/auth/forgot-password", &json!({ "email": email }))
        .await;
    let known = expect_json(known, StatusCode::OK).await;

    let unknown = anon
        .post("/api/auth/forgot-password", &json!({ "email": unique_email() }))
        .await;
    let unknown = expect_json(unknown, StatusCode::OK).await;

    assert_eq!(known["message"], unknown["message"]);
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_issued_reset_token_lives_one_hour() {
    let (_, registered) = ApiClient::register().await;
    let email = registered["data"]["user"]["email"].as_str().unwrap();
    let user_id: Uuid = registered["data"]["user"]["id"].as_str().unwrap().parse().unwrap();

    let response = ApiClient::anonymous()
        .post("/api/auth/forgot-password", &json!({ "email": email }))
        .await;
    expect_json(response, StatusCode::OK).await;

    let pool = pool().await;
    let lifetime_secs: f64 = sqlx::query_scalar(
        r"
        SELECT EXTRACT(EPOCH FROM expires_at - created_at)::float8
        FROM password_reset_tokens
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        ",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert!((lifetime_secs - 3600.0).abs() < 5.0, "lifetime {lifetime_secs}s");
}

#[tokio::test]
#[ignore = "Requires running API server and DATABASE_URL"]
async fn test_reset_token_rejected_after_expiry() {
    let (_, registered) = ApiClient::register().await;
    let user_id: Uuid = registered["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
    let pool = pool().await;

    // One token a minute past its window, one a minute inside it
    let expired = generate_opaque_token();
    let live = generate_opaque_token();
    for (token, offset) in [(&expired, -1_i32), (&live, 59)] {
        sqlx::query(
            r"
            INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, NOW() + make_interval(mins => $4))
            ",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_digest(token))
        .bind(offset)
        .execute(&pool)
        .await
        .unwrap();
    }

    let anon = ApiClient::anonymous();
    let new_password = "N3w!Passw0rd";

    let response = anon
        .post(
            "/api/auth/reset-password",
            &json!({ "token": expired, "password": new_password }),
        )
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"]["code"], "INVALID_RESET_TOKEN");

    let response = anon
        .post(
            "/api/auth/reset-password",
            &json!({ "token": live, "password": new_password }),
        )
        .await;
    expect_json(response, StatusCode::OK).await;

    // The token is single-use
    let response = anon
        .post(
            "/api/auth/reset-password",
            &json!({ "token": live, "password": new_password }),
        )
        .await;
    expect_json(response, StatusCode::BAD_REQUEST).await;
}
