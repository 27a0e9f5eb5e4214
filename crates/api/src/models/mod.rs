//! Domain models for the API.
//!
//! Models double as `sqlx::FromRow` targets and as JSON response bodies, so
//! field names serialize in camelCase.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod order;
pub mod user;
