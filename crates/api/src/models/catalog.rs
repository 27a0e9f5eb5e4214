//! Categories, products and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use emporium_core::rating::{RatingSummary, round_one_decimal};
use emporium_core::{CategoryId, ProductId, ReviewId, UserId};

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal category reference embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A category row with its product count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// Category tree node returned by the category endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryRef>,
    pub children: Vec<CategoryRef>,
    pub product_count: i64,
}

impl CategoryNode {
    /// Arrange a flat list of active categories into nodes with their children.
    ///
    /// Every category appears once at the top level. Children are the
    /// categories in `rows` whose parent it is.
    #[must_use]
    pub fn from_flat(rows: Vec<CategoryWithCount>) -> Vec<Self> {
        let refs: Vec<(Option<CategoryId>, CategoryRef)> = rows
            .iter()
            .map(|r| (r.category.parent_id, r.category.to_ref()))
            .collect();

        rows.into_iter()
            .map(|row| {
                let id = row.category.id;
                let parent = row
                    .category
                    .parent_id
                    .and_then(|pid| refs.iter().find(|(_, c)| c.id == pid))
                    .map(|(_, c)| c.clone());
                let children = refs
                    .iter()
                    .filter(|(parent_id, _)| *parent_id == Some(id))
                    .map(|(_, c)| c.clone())
                    .collect();

                Self {
                    category: row.category,
                    parent,
                    children,
                    product_count: row.product_count,
                }
            })
            .collect()
    }
}

impl Category {
    #[must_use]
    pub fn to_ref(&self) -> CategoryRef {
        CategoryRef {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// Fields for a new category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
}

/// Partial category update.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
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
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product row joined with its category and review aggregates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: String,
    pub category_slug: String,
    pub avg_rating: f64,
    pub review_count: i64,
}

/// Product as listed in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub category: CategoryRef,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

impl From<ProductRow> for ProductSummary {
    fn from(row: ProductRow) -> Self {
        let category = CategoryRef {
            id: row.product.category_id,
            name: row.category_name,
            slug: row.category_slug,
        };
        Self {
            product: row.product,
            category,
            rating: RatingSummary {
                avg_rating: round_one_decimal(row.avg_rating),
                review_count: row.review_count,
            },
        }
    }
}

/// Product detail with its reviews.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub reviews: Vec<ReviewWithAuthor>,
}

/// Admin listing row: product with category name and usage counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductAdminListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub order_item_count: i64,
    pub review_count: i64,
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
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

/// Partial product update.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
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

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reviewer name shown alongside a review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

/// Review row joined with the reviewer's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    #[sqlx(flatten)]
    pub review: Review,
    pub author_first_name: String,
    pub author_last_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: ReviewAuthor,
}

impl From<ReviewRow> for ReviewWithAuthor {
    fn from(row: ReviewRow) -> Self {
        let user = ReviewAuthor {
            id: row.review.user_id,
            first_name: row.author_first_name,
            last_name: row.author_last_name,
        };
        Self {
            review: row.review,
            user,
        }
    }
}

/// Fields for a new review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i32,
    pub title: String,
    pub comment: String,
}

/// Partial review update.
#[derive(Debug, Clone, Default)]
pub struct ReviewUpdate {
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(name: &str, parent: Option<CategoryId>) -> CategoryWithCount {
        CategoryWithCount {
            category: Category {
                id: CategoryId::new(),
                name: name.to_string(),
                slug: name.to_lowercase(),
                description: None,
                image: None,
                parent_id: parent,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            product_count: 0,
        }
    }

    #[test]
    fn test_category_tree_links_children_and_parent() {
        let electronics = category("Electronics", None);
        let root_id = electronics.category.id;
        let phones = category("Smartphones", Some(root_id));
        let laptops = category("Laptops", Some(root_id));
        let clothing = category("Clothing", None);

        let nodes = CategoryNode::from_flat(vec![electronics, phones, laptops, clothing]);
        assert_eq!(nodes.len(), 4);

        let root = nodes.iter().find(|n| n.category.id == root_id).unwrap();
        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Smartphones", "Laptops"]);
        assert!(root.parent.is_none());

        let phones = nodes.iter().find(|n| n.category.name == "Smartphones").unwrap();
        assert_eq!(phones.parent.as_ref().unwrap().id, root_id);
        assert!(phones.children.is_empty());
    }

    #[test]
    fn test_product_summary_serializes_flat_camel_case() {
        let category = category("Electronics", None).category;
        let row = ProductRow {
            product: Product {
                id: ProductId::new(),
                name: "iPhone 15 Pro".to_string(),
                slug: "iphone-15-pro".to_string(),
                description: "Phone".to_string(),
                price: Decimal::new(99_999, 2),
                compare_price: None,
                inventory: 50,
                sku: "IPHONE15PRO001".to_string(),
                category_id: category.id,
                images: vec![],
                variants: None,
                weight: None,
                seo_data: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            category_name: category.name.clone(),
            category_slug: category.slug.clone(),
            avg_rating: 4.333,
            review_count: 3,
        };

        let json = serde_json::to_value(ProductSummary::from(row)).unwrap();
        assert_eq!(json["price"], "999.99");
        assert_eq!(json["avgRating"], 4.3);
        assert_eq!(json["reviewCount"], 3);
        assert_eq!(json["category"]["name"], "Electronics");
        assert_eq!(json["categoryId"], category.id.to_string());
    }
}
