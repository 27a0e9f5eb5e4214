//! Seed the database with demo data.
//!
//! Creates an admin and a customer account, a small category tree, a handful
//! of products, one review and two coupons. Every insert is an upsert on its
//! natural key (email, slug, product/user pair, coupon code), so re-running
//! leaves existing rows untouched.
//!
//! | Account                | Password       | Role     |
//! |------------------------|----------------|----------|
//! | `admin@ecommerce.com`  | `Admin123!`    | ADMIN    |
//! | `customer@example.com` | `Customer123!` | CUSTOMER |

use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::info;

use emporium_api::services::auth::hash_password;
use emporium_core::{CategoryId, CouponId, ProductId, ReviewId, UserId, UserRole};

use super::{CommandError, connect};

struct SeedUser {
    email: &'static str,
    password: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    phone: Option<&'static str>,
    role: UserRole,
}

struct SeedCategory {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
}

struct SeedProduct {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    price: Decimal,
    compare_price: Option<Decimal>,
    inventory: i32,
    sku: &'static str,
    category: &'static str,
    images: &'static [&'static str],
    variants: Value,
    weight: Decimal,
    seo_data: Option<Value>,
}

struct SeedCoupon {
    code: &'static str,
    name: &'static str,
    kind: &'static str,
    value: Decimal,
    min_order_value: Decimal,
    usage_limit: i32,
    valid_days: i32,
}

const COUPONS: [SeedCoupon; 2] = [
    SeedCoupon {
        code: "WELCOME10",
        name: "Welcome Discount",
        kind: "PERCENTAGE",
        value: Decimal::from_parts(10, 0, 0, false, 0),
        min_order_value: Decimal::from_parts(50, 0, 0, false, 0),
        usage_limit: 1000,
        valid_days: 30,
    },
    SeedCoupon {
        code: "FREESHIP",
        name: "Free Shipping",
        kind: "FREE_SHIPPING",
        value: Decimal::ZERO,
        min_order_value: Decimal::from_parts(25, 0, 0, false, 0),
        usage_limit: 500,
        valid_days: 60,
    },
];

const ADMIN: SeedUser = SeedUser {
    email: "admin@ecommerce.com",
    password: "Admin123!",
    first_name: "Admin",
    last_name: "User",
    phone: None,
    role: UserRole::Admin,
};

const CUSTOMER: SeedUser = SeedUser {
    email: "customer@example.com",
    password: "Customer123!",
    first_name: "John",
    last_name: "Doe",
    phone: Some("+1234567890"),
    role: UserRole::Customer,
};

const ELECTRONICS: SeedCategory = SeedCategory {
    name: "Electronics",
    slug: "electronics",
    description: "Electronic devices and gadgets",
};

/// Children of Electronics.
const ELECTRONICS_CHILDREN: [SeedCategory; 2] = [
    SeedCategory {
        name: "Smartphones",
        slug: "smartphones",
        description: "Mobile phones and accessories",
    },
    SeedCategory {
        name: "Laptops",
        slug: "laptops",
        description: "Portable computers",
    },
];

const CLOTHING: SeedCategory = SeedCategory {
    name: "Clothing",
    slug: "clothing",
    description: "Fashion and apparel",
};

fn products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "iPhone 15 Pro",
            slug: "iphone-15-pro",
            description: "The latest iPhone with advanced features and stunning design.",
            price: Decimal::new(99_999, 2),
            compare_price: Some(Decimal::new(109_999, 2)),
            inventory: 50,
            sku: "IPHONE15PRO001",
            category: "smartphones",
            images: &[
                "https://images.unsplash.com/photo-1592750475338-74b7b21085ab?w=500",
                "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?w=500",
            ],
            variants: json!({
                "colors": ["Natural Titanium", "Blue Titanium", "White Titanium", "Black Titanium"],
                "storage": ["128GB", "256GB", "512GB", "1TB"],
            }),
            weight: Decimal::new(187, 3),
            seo_data: Some(json!({
                "title": "iPhone 15 Pro - Latest Apple Smartphone",
                "description": "Buy the new iPhone 15 Pro with advanced camera system and titanium design.",
                "keywords": ["iPhone", "Apple", "smartphone", "mobile"],
            })),
        },
        SeedProduct {
            name: "MacBook Pro 16\"",
            slug: "macbook-pro-16",
            description: "Powerful laptop for professionals with M3 Pro chip.",
            price: Decimal::new(249_999, 2),
            compare_price: None,
            inventory: 25,
            sku: "MBP16M3001",
            category: "laptops",
            images: &[
                "https://images.unsplash.com/photo-1517336714731-489689fd1ca8?w=500",
                "https://images.unsplash.com/photo-1496181133206-80ce9b88a853?w=500",
            ],
            variants: json!({
                "colors": ["Space Gray", "Silver"],
                "memory": ["18GB", "36GB"],
                "storage": ["512GB", "1TB", "2TB"],
            }),
            weight: Decimal::new(216, 2),
            seo_data: None,
        },
        SeedProduct {
            name: "Samsung Galaxy S24 Ultra",
            slug: "samsung-galaxy-s24-ultra",
            description: "Premium Android smartphone with S Pen and advanced camera.",
            price: Decimal::new(119_999, 2),
            compare_price: None,
            inventory: 30,
            sku: "GALAXYS24U001",
            category: "smartphones",
            images: &["https://images.unsplash.com/photo-1610945265064-0e34e5519bbf?w=500"],
            variants: json!({
                "colors": ["Titanium Black", "Titanium Gray", "Titanium Violet"],
                "storage": ["256GB", "512GB", "1TB"],
            }),
            weight: Decimal::new(232, 3),
            seo_data: None,
        },
        SeedProduct {
            name: "Classic Cotton T-Shirt",
            slug: "classic-cotton-t-shirt",
            description: "Comfortable and stylish cotton t-shirt for everyday wear.",
            price: Decimal::new(2_999, 2),
            compare_price: None,
            inventory: 100,
            sku: "TSHIRT001",
            category: "clothing",
            images: &["https://images.unsplash.com/photo-1521572163474-6864f9cf17ab?w=500"],
            variants: json!({
                "colors": ["White", "Black", "Navy", "Gray"],
                "sizes": ["XS", "S", "M", "L", "XL", "XXL"],
            }),
            weight: Decimal::new(2, 1),
            seo_data: None,
        },
        SeedProduct {
            name: "Dell XPS 13",
            slug: "dell-xps-13",
            description: "Ultra-portable laptop with stunning InfinityEdge display.",
            price: Decimal::new(129_999, 2),
            compare_price: None,
            inventory: 20,
            sku: "DELLXPS13001",
            category: "laptops",
            images: &["https://images.unsplash.com/photo-1588872657578-7efd1f1555ed?w=500"],
            variants: json!({
                "colors": ["Platinum Silver", "Frost White"],
                "processor": ["Intel i5", "Intel i7"],
                "memory": ["8GB", "16GB", "32GB"],
                "storage": ["256GB", "512GB", "1TB"],
            }),
            weight: Decimal::new(127, 2),
            seo_data: None,
        },
    ]
}

/// Seed demo accounts, categories, products and a review.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, a password cannot be
/// hashed, or any insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    info!("Starting database seed...");

    upsert_user(&pool, &ADMIN).await?;
    let customer_id = upsert_user(&pool, &CUSTOMER).await?;

    let electronics = upsert_category(&pool, &ELECTRONICS, None).await?;
    for child in &ELECTRONICS_CHILDREN {
        upsert_category(&pool, child, Some(electronics)).await?;
    }
    upsert_category(&pool, &CLOTHING, None).await?;

    let mut inserted = 0;
    for product in products() {
        let category_id = category_by_slug(&pool, product.category).await?;
        if insert_product(&pool, &product, category_id).await? {
            inserted += 1;
        }
    }
    info!(inserted, "Products seeded");

    let iphone: Option<ProductId> =
        sqlx::query_scalar("SELECT id FROM products WHERE slug = 'iphone-15-pro'")
            .fetch_optional(&pool)
            .await?;
    if let Some(product_id) = iphone {
        sqlx::query(
            r"
            INSERT INTO product_reviews (id, product_id, user_id, rating, title, comment)
            VALUES ($1, $2, $3, 5, 'Amazing phone!',
                    'The camera quality is incredible and the titanium design feels premium.')
            ON CONFLICT (product_id, user_id) DO NOTHING
            ",
        )
        .bind(ReviewId::new())
        .bind(product_id)
        .bind(customer_id)
        .execute(&pool)
        .await?;
    }

    for coupon in &COUPONS {
        insert_coupon(&pool, coupon).await?;
    }

    info!("Database seeded successfully!");
    info!("Admin user: {} / {}", ADMIN.email, ADMIN.password);
    info!("Customer user: {} / {}", CUSTOMER.email, CUSTOMER.password);
    Ok(())
}

/// Insert the user unless the email exists; returns the user's ID either way.
async fn upsert_user(pool: &PgPool, user: &SeedUser) -> Result<UserId, CommandError> {
    let password_hash = hash_password(user.password)?;

    // The no-op update makes RETURNING yield the existing row on conflict
    let id = sqlx::query_scalar(
        r"
        INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, email_verified)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        ",
    )
    .bind(UserId::new())
    .bind(user.email)
    .bind(password_hash)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.phone)
    .bind(user.role)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn upsert_category(
    pool: &PgPool,
    category: &SeedCategory,
    parent_id: Option<CategoryId>,
) -> Result<CategoryId, CommandError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO categories (id, name, slug, description, parent_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
        RETURNING id
        ",
    )
    .bind(CategoryId::new())
    .bind(category.name)
    .bind(category.slug)
    .bind(category.description)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn category_by_slug(pool: &PgPool, slug: &str) -> Result<CategoryId, CommandError> {
    Ok(
        sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_one(pool)
            .await?,
    )
}

/// Returns `false` when a product with the same slug already exists.
async fn insert_product(
    pool: &PgPool,
    product: &SeedProduct,
    category_id: CategoryId,
) -> Result<bool, CommandError> {
    let images: Vec<String> = product.images.iter().map(|s| (*s).to_owned()).collect();

    let result = sqlx::query(
        r"
        INSERT INTO products (
            id, name, slug, description, price, compare_price, inventory, sku,
            category_id, images, variants, weight, seo_data
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (slug) DO NOTHING
        ",
    )
    .bind(ProductId::new())
    .bind(product.name)
    .bind(product.slug)
    .bind(product.description)
    .bind(product.price)
    .bind(product.compare_price)
    .bind(product.inventory)
    .bind(product.sku)
    .bind(category_id)
    .bind(images)
    .bind(&product.variants)
    .bind(product.weight)
    .bind(&product.seo_data)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_coupon(pool: &PgPool, coupon: &SeedCoupon) -> Result<(), CommandError> {
    sqlx::query(
        r"
        INSERT INTO coupons (
            id, code, name, type, value, min_order_value, usage_limit, valid_from, valid_to
        )
        VALUES ($1, $2, $3, $4::coupon_type, $5, $6, $7, NOW(), NOW() + make_interval(days => $8))
        ON CONFLICT (code) DO NOTHING
        ",
    )
    .bind(CouponId::new())
    .bind(coupon.code)
    .bind(coupon.name)
    .bind(coupon.kind)
    .bind(coupon.value)
    .bind(coupon.min_order_value)
    .bind(coupon.usage_limit)
    .bind(coupon.valid_days)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_core::slug::slugify;

    #[test]
    fn test_seed_products_reference_seed_categories() {
        let slugs = [
            ELECTRONICS.slug,
            ELECTRONICS_CHILDREN[0].slug,
            ELECTRONICS_CHILDREN[1].slug,
            CLOTHING.slug,
        ];
        for product in products() {
            assert!(slugs.contains(&product.category), "{}", product.name);
        }
    }

    #[test]
    fn test_seed_products_are_valid() {
        let products = products();
        for product in &products {
            assert!(product.price > Decimal::ZERO);
            assert!(product.inventory >= 0);
            assert!(!product.images.is_empty());
        }
        let mut skus: Vec<_> = products.iter().map(|p| p.sku).collect();
        skus.sort_unstable();
        skus.dedup();
        assert_eq!(skus.len(), products.len());
    }

    #[test]
    fn test_seed_slugs_match_slugify() {
        for product in products().iter().filter(|p| !p.name.contains('"')) {
            assert_eq!(slugify(product.name), product.slug, "{}", product.name);
        }
    }

    #[test]
    fn test_seed_passwords_meet_policy() {
        for user in [&ADMIN, &CUSTOMER] {
            assert!(emporium_api::services::auth::validate_password(user.password).is_ok());
        }
    }
}
