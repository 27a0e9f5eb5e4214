//! Category handlers.
//!
//! ```text
//! GET    /api/categories                 - Active categories with children
//! GET    /api/categories/{id}            - One category with parent and children
//! GET    /api/categories/{id}/products   - Paginated products of a category
//! POST   /api/categories                 - Create (admin)
//! PUT    /api/categories/{id}            - Update (admin)
//! DELETE /api/categories/{id}            - Deactivate (admin)
//! ```

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::CategoryId;
use emporium_core::pagination::Pagination;
use emporium_core::slug::slugify;

use crate::db::RepositoryError;
use crate::db::categories::CategoryRepository;
use crate::db::products::{ProductFilter, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{Category, CategoryNode, CategoryUpdate, NewCategory, ProductSummary};
use crate::routes::extract::{PageQuery, ValidJson, ValidPath, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::routes::validation::{check_length, check_optional_length};
use crate::state::AppState;

const CATEGORY_NAME_LENGTH: (usize, usize) = (2, 100);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategoryNode>,
}

#[derive(Debug, Serialize)]
pub struct CategoryData<T> {
    pub category: T,
}

#[derive(Debug, Serialize)]
pub struct CategoryProducts {
    pub category: Category,
    pub products: Vec<ProductSummary>,
    pub pagination: Pagination,
}

fn category_not_found() -> AppError {
    AppError::not_found("CATEGORY_NOT_FOUND", "Category not found")
}

fn map_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => category_not_found(),
        other => other.into(),
    }
}

/// Active categories, each with its active children and product count.
#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<ApiResponse<CategoryList>> {
    let rows = CategoryRepository::new(state.pool()).list_active().await?;
    Ok(ApiResponse::ok(CategoryList {
        categories: CategoryNode::from_flat(rows),
    }))
}

/// One active category.
#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<CategoryId>,
) -> Result<ApiResponse<CategoryData<CategoryNode>>> {
    let repo = CategoryRepository::new(state.pool());
    let row = repo
        .get_active_with_count(id)
        .await?
        .ok_or_else(category_not_found)?;

    let parent = match row.category.parent_id {
        Some(parent_id) => repo.get(parent_id).await?.map(|p| p.to_ref()),
        None => None,
    };
    let children = repo
        .active_children(id)
        .await?
        .iter()
        .map(|c| c.category.to_ref())
        .collect();

    Ok(ApiResponse::ok(CategoryData {
        category: CategoryNode {
            category: row.category,
            parent,
            children,
            product_count: row.product_count,
        },
    }))
}

/// Active products of an active category.
#[instrument(skip(state))]
pub async fn category_products(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<CategoryId>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<CategoryProducts>> {
    let page = query.to_request()?;
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(category_not_found)?;

    let filter = ProductFilter {
        category: Some(id),
        ..ProductFilter::default()
    };
    let (rows, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;

    Ok(ApiResponse::ok(CategoryProducts {
        category,
        products: rows.into_iter().map(ProductSummary::from).collect(),
        pagination: page.meta(total),
    }))
}

/// Create a category. The slug is derived from the name.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidJson(body): ValidJson<CreateCategoryRequest>,
) -> Result<ApiResponse<CategoryData<Category>>> {
    let name = body.name.trim().to_string();
    check_length("name", &name, CATEGORY_NAME_LENGTH)?;

    let category = CategoryRepository::new(state.pool())
        .create(&NewCategory {
            slug: slugify(&name),
            name,
            description: body.description,
            image: body.image,
            parent_id: body.parent_id,
        })
        .await?;
    tracing::info!(category_id = %category.id, "Category created");

    Ok(ApiResponse::created(CategoryData { category })
        .with_message("Category created successfully"))
}

/// Update a category. A new name also regenerates the slug.
#[instrument(skip_all, fields(admin_id = %admin.id, category_id = %id))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<CategoryId>,
    ValidJson(body): ValidJson<UpdateCategoryRequest>,
) -> Result<ApiResponse<CategoryData<Category>>> {
    let name = body.name.map(|n| n.trim().to_string());
    check_optional_length("name", name.as_deref(), CATEGORY_NAME_LENGTH)?;
    if body.parent_id == Some(id) {
        return Err(AppError::validation("A category cannot be its own parent"));
    }

    let category = CategoryRepository::new(state.pool())
        .update(
            id,
            &CategoryUpdate {
                slug: name.as_deref().map(slugify),
                name,
                description: body.description,
                image: body.image,
                parent_id: body.parent_id,
                is_active: body.is_active,
            },
        )
        .await
        .map_err(map_not_found)?;

    Ok(ApiResponse::ok(CategoryData { category }).with_message("Category updated successfully"))
}

/// Deactivate a category that no product references.
#[instrument(skip_all, fields(admin_id = %admin.id, category_id = %id))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<CategoryId>,
) -> Result<ApiResponse<()>> {
    let repo = CategoryRepository::new(state.pool());
    if repo.product_count(id).await? > 0 {
        return Err(AppError::bad_request(
            "CATEGORY_HAS_PRODUCTS",
            "Cannot delete category with products",
        ));
    }

    repo.deactivate(id).await.map_err(map_not_found)?;
    tracing::info!("Category deactivated");
    Ok(ApiResponse::message("Category deleted successfully"))
}
