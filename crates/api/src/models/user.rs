//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{Email, UserId, UserRole};

use super::address::Address;
use super::order::Order;

/// An account as exposed to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user row together with its stored password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
}

/// Self-service profile changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// Admin changes to an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
}

/// Admin listing row with the number of orders placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub order_count: i64,
}

/// Admin detail view: the account with its addresses and latest orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
    pub orders: Vec<Order>,
}

/// Public part of a user shown next to orders.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
}
