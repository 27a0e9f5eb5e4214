//! Emporium Core - Shared domain types.
//!
//! This crate provides the types and pure business rules used across all
//! Emporium components:
//! - `api` - The REST backend
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encodings are available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and statuses
//! - [`pricing`] - Order totals (tax and shipping rules)
//! - [`pagination`] - Page/limit normalization and page metadata
//! - [`slug`] - URL slugs derived from display names
//! - [`rating`] - Review rating aggregation
//! - [`ledger`] - Income/expense ledger summaries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ledger;
pub mod pagination;
pub mod pricing;
pub mod rating;
pub mod slug;
pub mod types;

pub use types::*;

/// Re-exported so `define_id!` expansions resolve `uuid` without a direct dependency.
#[doc(hidden)]
pub use uuid;
