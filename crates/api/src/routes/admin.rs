//! Admin dashboard handlers. Every route requires `ADMIN` or `SUPER_ADMIN`.
//!
//! ```text
//! GET /api/admin/dashboard   - Totals, recent orders, best sellers
//! GET /api/admin/analytics   - Activity over the last 30 days
//! GET /api/admin/ledger      - Sales ledger summary over the last 30 days
//! GET /api/admin/users       - Paginated users with order counts
//! GET /api/admin/orders      - Paginated orders with customers
//! GET /api/admin/products    - Paginated products with usage counts
//! ```

use axum::extract::State;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::instrument;

use emporium_core::pagination::Pagination;

use crate::db::dashboard::DashboardRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::catalog::ProductAdminListing;
use crate::models::dashboard::{Analytics, Dashboard, Ledger};
use crate::models::order::AdminOrderWithItems;
use crate::models::user::UserListing;
use crate::routes::extract::{PageQuery, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::state::AppState;

const RECENT_ORDERS: i64 = 5;
const TOP_PRODUCTS: i64 = 5;
const ANALYTICS_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub last_30_days: Analytics,
}

#[derive(Debug, Serialize)]
pub struct AdminUsers {
    pub users: Vec<UserListing>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct AdminOrders {
    pub orders: Vec<AdminOrderWithItems>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct AdminProducts {
    pub products: Vec<ProductAdminListing>,
    pub pagination: Pagination,
}

/// Store totals with the latest orders and best sellers.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<Dashboard>> {
    let repo = DashboardRepository::new(state.pool());
    let orders = OrderRepository::new(state.pool());

    let (stats, recent_orders, top_products) = tokio::try_join!(
        repo.stats(),
        orders.recent(RECENT_ORDERS),
        repo.top_products(TOP_PRODUCTS),
    )?;

    Ok(ApiResponse::ok(Dashboard {
        stats,
        recent_orders,
        top_products,
    }))
}

/// Orders, delivered revenue and sign-ups over the trailing window.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn analytics(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<AnalyticsData>> {
    let repo = DashboardRepository::new(state.pool());
    let since = Utc::now() - Duration::days(ANALYTICS_DAYS);

    let (order_count, revenue, new_users, orders_by_status) = tokio::try_join!(
        repo.orders_since(since),
        repo.revenue_since(since),
        repo.users_since(since),
        repo.status_counts_since(since),
    )?;

    Ok(ApiResponse::ok(AnalyticsData {
        last_30_days: Analytics {
            period_days: ANALYTICS_DAYS,
            order_count,
            revenue,
            new_users,
            orders_by_status,
        },
    }))
}

/// Income and refunds from orders placed in the trailing window.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn ledger(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<Ledger>> {
    let since = Utc::now() - Duration::days(ANALYTICS_DAYS);
    let orders = DashboardRepository::new(state.pool())
        .order_payments_since(since)
        .await?;

    Ok(ApiResponse::ok(Ledger::from_orders(ANALYTICS_DAYS, &orders)))
}

/// Users with their order counts.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<AdminUsers>> {
    let page = query.to_request()?;
    let (users, total) = UserRepository::new(state.pool()).list(page).await?;
    Ok(ApiResponse::ok(AdminUsers {
        users,
        pagination: page.meta(total),
    }))
}

/// Orders with customers and items.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<AdminOrders>> {
    let page = query.to_request()?;
    let (orders, total) = OrderRepository::new(state.pool()).list_all(page).await?;
    Ok(ApiResponse::ok(AdminOrders {
        orders,
        pagination: page.meta(total),
    }))
}

/// Products, including inactive ones, with order and review counts.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<AdminProducts>> {
    let page = query.to_request()?;
    let (products, total) = ProductRepository::new(state.pool())
        .admin_list(page)
        .await?;
    Ok(ApiResponse::ok(AdminProducts {
        products,
        pagination: page.meta(total),
    }))
}
