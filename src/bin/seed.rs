use serde_json::json;
use storefront_api::{
    config::AppConfig,
    db::{DbPool, create_pool},
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    services::{
        auth_service::hash_password,
        catalog_service::{SlugTable, generate_slug},
    },
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_api=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123", ROLE_USER).await?;

    let clothing = ensure_category(&pool, "Clothing", None).await?;
    let shoes = ensure_category(&pool, "Shoes", Some(clothing)).await?;
    let accessories = ensure_category(&pool, "Accessories", None).await?;
    seed_products(&pool, clothing, shoes, accessories).await?;

    tracing::info!(%admin_id, %user_id, "seed completed");
    Ok(())
}

async fn ensure_user(pool: &DbPool, email: &str, password: &str, role: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    tracing::info!(email, role, "ensured user");
    Ok(user_id)
}

async fn ensure_category(pool: &DbPool, name: &str, parent_id: Option<Uuid>) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let slug = generate_slug(pool, SlugTable::Categories, name).await?;
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO categories (id, name, slug, parent_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(&slug)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(name, slug, "seeded category");
    Ok(id)
}

async fn seed_products(
    pool: &DbPool,
    clothing: Uuid,
    shoes: Uuid,
    accessories: Uuid,
) -> anyhow::Result<()> {
    // (name, price, discount, stock, shipping_cost, category)
    let products = [
        ("Ferris Hoodie", 5500_i64, 10, 50, 300_i64, clothing),
        ("Trail Runner", 999, 33, 20, 100, shoes),
        ("Canvas Sneaker", 1000, 0, 0, 100, shoes),
        ("Ferris Mug", 1200, 0, 100, 0, accessories),
    ];

    for (name, price, discount, quantity, shipping_cost, category_id) in products {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, price, discount, quantity, shipping_cost, category_id, info, specification)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(price)
        .bind(discount)
        .bind(quantity)
        .bind(shipping_cost)
        .bind(category_id)
        .bind(format!("{name} from the demo catalog"))
        .bind(json!({ "material": "cotton", "origin": "demo" }))
        .execute(pool)
        .await?;
    }

    tracing::info!(count = products.len(), "seeded products");
    Ok(())
}
