//! Address book and user administration handlers.
//!
//! ```text
//! GET    /api/users/addresses        - Caller's addresses, default first
//! POST   /api/users/addresses        - Add an address
//! PUT    /api/users/addresses/{id}   - Update an address
//! DELETE /api/users/addresses/{id}   - Delete an address
//! GET    /api/users                  - All users (admin)
//! GET    /api/users/{id}             - User with addresses and latest orders (admin)
//! PUT    /api/users/{id}             - Update names, phone, role, verification (admin)
//! DELETE /api/users/{id}             - Delete a user (super admin)
//! ```

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::pagination::Pagination;
use emporium_core::{AddressId, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::addresses::AddressRepository;
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth, RequireSuperAdmin};
use crate::models::address::{Address, AddressInput, AddressUpdate};
use crate::models::user::{AdminUserUpdate, User, UserDetail, UserListing};
use crate::routes::extract::{PageQuery, ValidJson, ValidPath, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::routes::validation::{NAME_LENGTH, check_optional_length, check_phone, check_required};
use crate::state::AppState;

const LATEST_ORDERS: i64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AddressList {
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize)]
pub struct AddressData {
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<UserListing>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserData<T> {
    pub user: T,
}

fn address_not_found() -> AppError {
    AppError::not_found("ADDRESS_NOT_FOUND", "Address not found")
}

fn user_not_found() -> AppError {
    AppError::not_found("USER_NOT_FOUND", "User not found")
}

fn map_address_error(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => address_not_found(),
        other => other.into(),
    }
}

fn map_user_error(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => user_not_found(),
        other => other.into(),
    }
}

/// Only super admins may grant `SUPER_ADMIN` or touch a super admin account.
fn check_super_admin_guard(
    actor: UserRole,
    target: UserRole,
    requested: Option<UserRole>,
) -> Result<()> {
    if actor.is_super_admin() {
        return Ok(());
    }
    if requested == Some(UserRole::SuperAdmin) {
        return Err(AppError::Forbidden(
            "Only a super admin can grant the SUPER_ADMIN role".to_string(),
        ));
    }
    if target.is_super_admin() {
        return Err(AppError::Forbidden(
            "Only a super admin can modify a super admin".to_string(),
        ));
    }
    Ok(())
}

fn check_address_input(input: &AddressInput) -> Result<()> {
    check_required("street", &input.street)?;
    check_required("city", &input.city)?;
    check_required("state", &input.state)?;
    check_required("zipCode", &input.zip_code)?;
    check_required("country", &input.country)
}

fn check_address_update(update: &AddressUpdate) -> Result<()> {
    for (field, value) in [
        ("street", &update.street),
        ("city", &update.city),
        ("state", &update.state),
        ("zipCode", &update.zip_code),
        ("country", &update.country),
    ] {
        if let Some(value) = value {
            check_required(field, value)?;
        }
    }
    Ok(())
}

// =============================================================================
// Addresses
// =============================================================================

/// The caller's addresses.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<AddressList>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(ApiResponse::ok(AddressList { addresses }))
}

/// Add an address. A new default replaces the previous one.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(body): ValidJson<AddressInput>,
) -> Result<ApiResponse<AddressData>> {
    check_address_input(&body)?;

    let address = AddressRepository::new(state.pool())
        .create(user.id, &body)
        .await?;
    Ok(ApiResponse::created(AddressData { address }).with_message("Address created successfully"))
}

/// Update one of the caller's addresses.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(id): ValidPath<AddressId>,
    ValidJson(body): ValidJson<AddressUpdate>,
) -> Result<ApiResponse<AddressData>> {
    check_address_update(&body)?;

    let address = AddressRepository::new(state.pool())
        .update(id, user.id, &body)
        .await
        .map_err(map_address_error)?;
    Ok(ApiResponse::ok(AddressData { address }).with_message("Address updated successfully"))
}

/// Delete one of the caller's addresses.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(id): ValidPath<AddressId>,
) -> Result<ApiResponse<()>> {
    AddressRepository::new(state.pool())
        .delete(id, user.id)
        .await
        .map_err(map_address_error)?;
    Ok(ApiResponse::message("Address deleted successfully"))
}

// =============================================================================
// Admin
// =============================================================================

/// All users, newest first, with their order counts.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<UserPage>> {
    let page = query.to_request()?;
    let (users, total) = UserRepository::new(state.pool()).list(page).await?;

    Ok(ApiResponse::ok(UserPage {
        users,
        pagination: page.meta(total),
    }))
}

/// One user with their addresses and latest orders.
#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<UserId>,
) -> Result<ApiResponse<UserData<UserDetail>>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(id)
        .await?;
    let orders = OrderRepository::new(state.pool())
        .latest_for_user(id, LATEST_ORDERS)
        .await?;

    Ok(ApiResponse::ok(UserData {
        user: UserDetail {
            user,
            addresses,
            orders,
        },
    }))
}

/// Update a user's names, phone, role or verification flag.
#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<UserId>,
    ValidJson(body): ValidJson<AdminUpdateUserRequest>,
) -> Result<ApiResponse<UserData<User>>> {
    let first_name = body.first_name.map(|n| n.trim().to_string());
    let last_name = body.last_name.map(|n| n.trim().to_string());
    check_optional_length("firstName", first_name.as_deref(), NAME_LENGTH)?;
    check_optional_length("lastName", last_name.as_deref(), NAME_LENGTH)?;
    check_phone(body.phone.as_deref())?;

    let users = UserRepository::new(state.pool());
    let target = users.get_by_id(id).await?.ok_or_else(user_not_found)?;
    check_super_admin_guard(admin.role, target.role, body.role)?;

    let user = users
        .admin_update(
            id,
            &AdminUserUpdate {
                first_name,
                last_name,
                phone: body.phone,
                role: body.role,
                email_verified: body.email_verified,
            },
        )
        .await
        .map_err(map_user_error)?;

    tracing::info!(role = %user.role, "User updated by admin");
    Ok(ApiResponse::ok(UserData { user }).with_message("User updated successfully"))
}

/// Delete a user who has never placed an order.
#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    ValidPath(id): ValidPath<UserId>,
) -> Result<ApiResponse<()>> {
    UserRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::ForeignKey(_) => AppError::bad_request(
                "USER_HAS_ORDERS",
                "User has placed orders and cannot be deleted",
            ),
            other => map_user_error(other),
        })?;

    tracing::warn!("User deleted");
    Ok(ApiResponse::message("User deleted successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_cannot_demote_or_edit_super_admin() {
        let err = check_super_admin_guard(
            UserRole::Admin,
            UserRole::SuperAdmin,
            Some(UserRole::Customer),
        )
        .unwrap_err();
        assert_eq!(err.parts().0, axum::http::StatusCode::FORBIDDEN);
        assert_eq!(err.parts().2, "Only a super admin can modify a super admin");

        assert!(check_super_admin_guard(UserRole::Admin, UserRole::SuperAdmin, None).is_err());
        assert!(
            check_super_admin_guard(UserRole::Admin, UserRole::Customer, Some(UserRole::SuperAdmin))
                .is_err()
        );
    }

    #[test]
    fn test_super_admin_and_ordinary_updates_pass() {
        assert!(
            check_super_admin_guard(
                UserRole::SuperAdmin,
                UserRole::SuperAdmin,
                Some(UserRole::Admin)
            )
            .is_ok()
        );
        assert!(
            check_super_admin_guard(UserRole::Admin, UserRole::Customer, Some(UserRole::Admin))
                .is_ok()
        );
        assert!(check_super_admin_guard(UserRole::Admin, UserRole::Admin, None).is_ok());
    }

    #[test]
    fn test_address_input_requires_fields() {
        let input: AddressInput = serde_json::from_value(json!({
            "street": "1 Main St",
            "city": "Springfield",
            "state": "IL",
            "zipCode": "62701",
            "country": "US",
        }))
        .unwrap();
        assert!(!input.is_default);
        assert!(check_address_input(&input).is_ok());

        let blank = AddressInput {
            city: String::new(),
            ..input
        };
        assert_eq!(
            check_address_input(&blank).unwrap_err().parts().2,
            "city is required"
        );
    }

    #[test]
    fn test_address_update_checks_present_fields_only() {
        assert!(check_address_update(&AddressUpdate::default()).is_ok());

        let update = AddressUpdate {
            country: Some("  ".to_string()),
            ..AddressUpdate::default()
        };
        assert!(check_address_update(&update).is_err());
    }

    #[test]
    fn test_not_found_errors_are_specific() {
        assert_eq!(map_address_error(RepositoryError::NotFound).parts().1, "ADDRESS_NOT_FOUND");
        assert_eq!(map_user_error(RepositoryError::NotFound).parts().1, "USER_NOT_FOUND");
    }
}
