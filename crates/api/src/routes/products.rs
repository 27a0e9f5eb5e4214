//! Product catalog and review handlers.
//!
//! ```text
//! GET    /api/products                      - Filtered, sorted, paginated listing
//! GET    /api/products/search?q=            - Text search
//! GET    /api/products/featured             - 8 newest products
//! GET    /api/products/recommendations      - 6 newest products (optional auth)
//! GET    /api/products/{id}                 - Product with reviews and rating
//! GET    /api/products/{id}/reviews         - Paginated reviews
//! POST   /api/products/{id}/reviews         - Review a product (auth)
//! PUT    /api/products/reviews/{reviewId}   - Edit own review (auth)
//! DELETE /api/products/reviews/{reviewId}   - Delete own review (auth)
//! POST   /api/products                      - Create product (admin)
//! PUT    /api/products/{id}                 - Update product (admin)
//! DELETE /api/products/{id}                 - Deactivate product (admin)
//! ```

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use emporium_core::pagination::{PageRequest, Pagination};
use emporium_core::slug::slugify;
use emporium_core::{CategoryId, ProductId, ReviewId};

use crate::db::RepositoryError;
use crate::db::products::{ProductFilter, ProductRepository, SortField, SortOrder};
use crate::db::reviews::ReviewRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::catalog::{
    NewProduct, NewReview, Product, ProductDetail, ProductSummary, ProductUpdate, ReviewAuthor,
    ReviewUpdate, ReviewWithAuthor,
};
use crate::routes::extract::{PageQuery, ValidJson, ValidPath, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::routes::validation::{
    PRODUCT_DESCRIPTION_MIN, PRODUCT_NAME_LENGTH, check_length, check_optional_length,
    check_required, check_review,
};
use crate::state::AppState;

const FEATURED_COUNT: i64 = 8;
const RECOMMENDATION_COUNT: i64 = 6;

// =============================================================================
// Request / response types
// =============================================================================

/// Catalog listing query. Pagination fields are inline because
/// `serde(flatten)` does not work with numeric query values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl ProductListQuery {
    fn into_parts(self) -> Result<(ProductFilter, PageRequest)> {
        let page = PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .to_request()?;
        let filter = ProductFilter {
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
            search: self.search,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub title: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub inventory: i32,
    pub sku: String,
    pub category_id: CategoryId,
    pub images: Vec<String>,
    pub variants: Option<Value>,
    pub weight: Option<Decimal>,
    pub seo_data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_price: Option<Decimal>,
    pub inventory: Option<i32>,
    pub sku: Option<String>,
    pub category_id: Option<CategoryId>,
    pub images: Option<Vec<String>>,
    pub variants: Option<Value>,
    pub weight: Option<Decimal>,
    pub seo_data: Option<Value>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProductData<T> {
    pub product: T,
}

#[derive(Debug, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<ReviewWithAuthor>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ReviewData {
    pub review: ReviewWithAuthor,
}

// =============================================================================
// Validation
// =============================================================================

fn check_positive(field: &str, value: Option<Decimal>) -> Result<()> {
    match value {
        Some(v) if v <= Decimal::ZERO => Err(AppError::validation(format!(
            "{field} must be a positive number"
        ))),
        _ => Ok(()),
    }
}

fn check_inventory(value: Option<i32>) -> Result<()> {
    match value {
        Some(v) if v < 0 => Err(AppError::validation(
            "inventory must be greater than or equal to 0",
        )),
        _ => Ok(()),
    }
}

fn check_description(value: Option<&str>) -> Result<()> {
    match value {
        Some(d) if d.chars().count() < PRODUCT_DESCRIPTION_MIN => {
            Err(AppError::validation(format!(
                "description must be at least {PRODUCT_DESCRIPTION_MIN} characters long"
            )))
        }
        _ => Ok(()),
    }
}

fn check_images(value: Option<&[String]>) -> Result<()> {
    match value {
        Some([]) => Err(AppError::validation("images must contain at least 1 items")),
        _ => Ok(()),
    }
}

impl CreateProductRequest {
    fn validate(&self) -> Result<()> {
        check_length("name", self.name.trim(), PRODUCT_NAME_LENGTH)?;
        check_description(Some(&self.description))?;
        check_positive("price", Some(self.price))?;
        check_positive("comparePrice", self.compare_price)?;
        check_inventory(Some(self.inventory))?;
        check_required("sku", &self.sku)?;
        check_images(Some(&self.images))?;
        check_positive("weight", self.weight)
    }

    fn into_new_product(self) -> NewProduct {
        let name = self.name.trim().to_string();
        NewProduct {
            slug: slugify(&name),
            name,
            description: self.description,
            price: self.price,
            compare_price: self.compare_price,
            inventory: self.inventory,
            sku: self.sku.trim().to_string(),
            category_id: self.category_id,
            images: self.images,
            variants: self.variants,
            weight: self.weight,
            seo_data: self.seo_data,
        }
    }
}

impl UpdateProductRequest {
    fn validate(&self) -> Result<()> {
        check_optional_length("name", self.name.as_deref().map(str::trim), PRODUCT_NAME_LENGTH)?;
        check_description(self.description.as_deref())?;
        check_positive("price", self.price)?;
        check_positive("comparePrice", self.compare_price)?;
        check_inventory(self.inventory)?;
        if let Some(sku) = &self.sku {
            check_required("sku", sku)?;
        }
        check_images(self.images.as_deref())?;
        check_positive("weight", self.weight)
    }

    fn into_update(self) -> ProductUpdate {
        let name = self.name.map(|n| n.trim().to_string());
        ProductUpdate {
            slug: name.as_deref().map(slugify),
            name,
            description: self.description,
            price: self.price,
            compare_price: self.compare_price,
            inventory: self.inventory,
            sku: self.sku.map(|s| s.trim().to_string()),
            category_id: self.category_id,
            images: self.images,
            variants: self.variants,
            weight: self.weight,
            seo_data: self.seo_data,
            is_active: self.is_active,
        }
    }
}

fn product_not_found() -> AppError {
    AppError::not_found("PRODUCT_NOT_FOUND", "Product not found")
}

fn review_not_found() -> AppError {
    AppError::not_found("REVIEW_NOT_FOUND", "Review not found")
}

fn review_exists() -> AppError {
    AppError::conflict("REVIEW_EXISTS", "You have already reviewed this product")
}

// =============================================================================
// Catalog
// =============================================================================

/// List active products.
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ProductListQuery>,
) -> Result<ApiResponse<ProductPage>> {
    let (filter, page) = query.into_parts()?;
    let (rows, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;

    Ok(ApiResponse::ok(ProductPage {
        products: rows.into_iter().map(ProductSummary::from).collect(),
        pagination: page.meta(total),
    }))
}

/// Search active products by name or description.
#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<SearchQuery>,
) -> Result<ApiResponse<ProductPage>> {
    let term = query.q.unwrap_or_default();
    check_required("q", &term)?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .to_request()?;

    let filter = ProductFilter {
        search: Some(term),
        ..ProductFilter::default()
    };
    let (rows, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;

    Ok(ApiResponse::ok(ProductPage {
        products: rows.into_iter().map(ProductSummary::from).collect(),
        pagination: page.meta(total),
    }))
}

/// Newest products for the storefront home page.
#[instrument(skip(state))]
pub async fn featured_products(State(state): State<AppState>) -> Result<ApiResponse<ProductList>> {
    let rows = ProductRepository::new(state.pool())
        .newest(FEATURED_COUNT)
        .await?;
    Ok(ApiResponse::ok(ProductList {
        products: rows.into_iter().map(ProductSummary::from).collect(),
    }))
}

/// Recommendations. Currently the newest products for every caller.
#[instrument(skip_all)]
pub async fn recommendations(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<ApiResponse<ProductList>> {
    tracing::debug!(authenticated = user.is_some(), "Serving recommendations");
    let rows = ProductRepository::new(state.pool())
        .newest(RECOMMENDATION_COUNT)
        .await?;
    Ok(ApiResponse::ok(ProductList {
        products: rows.into_iter().map(ProductSummary::from).collect(),
    }))
}

/// One active product with its reviews.
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<ProductId>,
) -> Result<ApiResponse<ProductData<ProductDetail>>> {
    let row = ProductRepository::new(state.pool())
        .get_active_row(id)
        .await?
        .ok_or_else(product_not_found)?;
    let reviews = ReviewRepository::new(state.pool())
        .all_for_product(id)
        .await?;

    Ok(ApiResponse::ok(ProductData {
        product: ProductDetail {
            summary: ProductSummary::from(row),
            reviews: reviews.into_iter().map(ReviewWithAuthor::from).collect(),
        },
    }))
}

/// Paginated reviews of a product.
#[instrument(skip(state))]
pub async fn product_reviews(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<ProductId>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<ReviewPage>> {
    let page = query.to_request()?;
    let (rows, total) = ReviewRepository::new(state.pool())
        .list_for_product(id, page)
        .await?;

    Ok(ApiResponse::ok(ReviewPage {
        reviews: rows.into_iter().map(ReviewWithAuthor::from).collect(),
        pagination: page.meta(total),
    }))
}

// =============================================================================
// Reviews
// =============================================================================

/// Review a product. One review per user and product.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(product_id): ValidPath<ProductId>,
    ValidJson(body): ValidJson<CreateReviewRequest>,
) -> Result<ApiResponse<ReviewData>> {
    check_review(Some(body.rating), Some(&body.title), Some(&body.comment))?;

    ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(product_not_found)?;

    let reviews = ReviewRepository::new(state.pool());
    if reviews.exists_for(product_id, user.id).await? {
        return Err(review_exists());
    }

    let review = reviews
        .create(&NewReview {
            product_id,
            user_id: user.id,
            rating: body.rating,
            title: body.title,
            comment: body.comment,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => review_exists(),
            other => other.into(),
        })?;

    let author = ReviewAuthor {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
    };
    Ok(ApiResponse::created(ReviewData {
        review: ReviewWithAuthor {
            review,
            user: author,
        },
    })
    .with_message("Review created successfully"))
}

/// Edit the caller's own review.
#[instrument(skip_all, fields(user_id = %user.id, review_id = %review_id))]
pub async fn update_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(review_id): ValidPath<ReviewId>,
    ValidJson(body): ValidJson<UpdateReviewRequest>,
) -> Result<ApiResponse<ReviewData>> {
    check_review(body.rating, body.title.as_deref(), body.comment.as_deref())?;

    let reviews = ReviewRepository::new(state.pool());
    let existing = reviews.get(review_id).await?.ok_or_else(review_not_found)?;
    if existing.user_id != user.id {
        return Err(AppError::Forbidden(
            "You can only update your own reviews".to_string(),
        ));
    }

    let review = reviews
        .update(
            review_id,
            &ReviewUpdate {
                rating: body.rating,
                title: body.title,
                comment: body.comment,
            },
        )
        .await?;

    let author = ReviewAuthor {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
    };
    Ok(ApiResponse::ok(ReviewData {
        review: ReviewWithAuthor {
            review,
            user: author,
        },
    })
    .with_message("Review updated successfully"))
}

/// Delete the caller's own review.
#[instrument(skip_all, fields(user_id = %user.id, review_id = %review_id))]
pub async fn delete_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidPath(review_id): ValidPath<ReviewId>,
) -> Result<ApiResponse<()>> {
    let reviews = ReviewRepository::new(state.pool());
    let existing = reviews.get(review_id).await?.ok_or_else(review_not_found)?;
    if existing.user_id != user.id {
        return Err(AppError::Forbidden(
            "You can only delete your own reviews".to_string(),
        ));
    }

    reviews.delete(review_id).await?;
    Ok(ApiResponse::message("Review deleted successfully"))
}

// =============================================================================
// Admin
// =============================================================================

/// Create a product. The slug is derived from the name.
#[instrument(skip_all, fields(admin_id = %admin.id, sku = %body.sku))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidJson(body): ValidJson<CreateProductRequest>,
) -> Result<ApiResponse<ProductData<Product>>> {
    body.validate()?;

    let product = ProductRepository::new(state.pool())
        .create(&body.into_new_product())
        .await?;
    tracing::info!(product_id = %product.id, "Product created");

    Ok(ApiResponse::created(ProductData { product }).with_message("Product created successfully"))
}

/// Update a product. A new name also regenerates the slug.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<ProductId>,
    ValidJson(body): ValidJson<UpdateProductRequest>,
) -> Result<ApiResponse<ProductData<Product>>> {
    body.validate()?;

    let product = ProductRepository::new(state.pool())
        .update(id, &body.into_update())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(),
            other => other.into(),
        })?;

    Ok(ApiResponse::ok(ProductData { product }).with_message("Product updated successfully"))
}

/// Deactivate a product. Order history keeps referencing it.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidPath(id): ValidPath<ProductId>,
) -> Result<ApiResponse<()>> {
    ProductRepository::new(state.pool())
        .deactivate(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(),
            other => other.into(),
        })?;

    tracing::info!("Product deactivated");
    Ok(ApiResponse::message("Product deleted successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_body() -> serde_json::Value {
        json!({
            "name": "  MacBook Pro 16\"  ",
            "description": "M3 Max, 36GB unified memory",
            "price": "2499.99",
            "inventory": 25,
            "sku": "MBP16M3001",
            "categoryId": CategoryId::new(),
            "images": ["https://example.com/mbp.jpg"],
        })
    }

    #[test]
    fn test_create_request_validates_and_slugs() {
        let request: CreateProductRequest = serde_json::from_value(product_body()).unwrap();
        request.validate().unwrap();

        let new = request.into_new_product();
        assert_eq!(new.name, "MacBook Pro 16\"");
        assert_eq!(new.slug, "macbook-pro-16\"");
        assert_eq!(new.price, Decimal::new(249_999, 2));
    }

    #[test]
    fn test_create_request_rejections() {
        let cases = [
            ("price", json!(0)),
            ("comparePrice", json!(-1)),
            ("inventory", json!(-1)),
            ("images", json!([])),
            ("description", json!("short")),
            ("sku", json!("  ")),
            ("weight", json!(0)),
        ];
        for (field, value) in cases {
            let mut body = product_body();
            body[field] = value;
            let request: CreateProductRequest = serde_json::from_value(body).unwrap();
            let err = request.validate().unwrap_err();
            assert_eq!(err.parts().1, "VALIDATION_ERROR", "{field}");
        }
    }

    #[test]
    fn test_update_request_partial() {
        let request: UpdateProductRequest =
            serde_json::from_value(json!({"inventory": 0, "isActive": false})).unwrap();
        request.validate().unwrap();

        let update = request.into_update();
        assert_eq!(update.inventory, Some(0));
        assert_eq!(update.is_active, Some(false));
        assert!(update.slug.is_none());

        let renamed: UpdateProductRequest =
            serde_json::from_value(json!({"name": "iPhone 15 Pro Max"})).unwrap();
        assert_eq!(renamed.into_update().slug.as_deref(), Some("iphone-15-pro-max"));
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ProductListQuery = serde_json::from_value(json!({})).unwrap();
        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(filter.sort_by, SortField::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Desc);
        assert_eq!((page.page(), page.limit()), (1, 10));
    }
}
