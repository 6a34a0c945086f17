use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use serde_json::json;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "Admin", "admin").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123", "Test User", "user").await?;
    let category_id = seed_categories(&pool).await?;
    seed_products(&pool, category_id).await?;
    seed_coupons(&pool).await?;
    seed_pages(&pool).await?;
    seed_faqs(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(row.0)
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<Uuid> {
    let (root_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug, sort_order)
        VALUES ($1, 'Electronics', 'electronics', 0)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await?;

    let children = [("Phones", "phones", 0), ("Audio", "audio", 1)];
    for (name, slug, sort_order) in children {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, parent_id, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(root_id)
        .bind(sort_order)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(root_id)
}

async fn seed_products(pool: &sqlx::PgPool, category_id: Uuid) -> anyhow::Result<()> {
    let sections = json!([
        { "kind": "text", "title": "Overview", "body": "A solid everyday pick." },
        { "kind": "bullets", "title": "Highlights", "items": ["Two-year warranty", "Free returns"] },
        { "kind": "spec_table", "title": "Specifications", "rows": [
            { "label": "Weight", "value": "180 g" },
            { "label": "Colour", "value": "Graphite" }
        ]}
    ]);

    let products = [
        ("Nimbus Phone X", "nimbus-phone-x", 5_500_000_i64, Some(5_990_000_i64), 50, true),
        ("Cirrus Earbuds", "cirrus-earbuds", 1_200_000, None, 100, false),
        ("Stratus Charger", "stratus-charger", 500_000, None, 200, false),
    ];

    for (name, slug, price, compare_at_price, stock, is_featured) in products {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, slug, description, category_id, price, compare_at_price,
                 stock, sections, is_featured, is_on_sale)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(format!("{name} from the demo catalog"))
        .bind(category_id)
        .bind(price)
        .bind(compare_at_price)
        .bind(stock)
        .bind(&sections)
        .bind(is_featured)
        .bind(compare_at_price.is_some())
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_coupons(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons (id, code, kind, value, min_order_value, max_discount, usage_limit)
        VALUES ($1, 'WELCOME10', 'percentage', 10, 500000, 1000000, 1000)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .execute(pool)
    .await?;

    println!("Seeded coupons");
    Ok(())
}

async fn seed_pages(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let pages = [
        ("about", "About Us", "We sell things we like."),
        ("shipping", "Shipping Policy", "Orders ship within two business days."),
    ];
    for (slug, title, body) in pages {
        sqlx::query(
            r#"
            INSERT INTO pages (id, slug, title, body, is_published)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(title)
        .bind(body)
        .execute(pool)
        .await?;
    }

    println!("Seeded pages");
    Ok(())
}

async fn seed_faqs(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM faqs")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let faqs = [
        ("How long does delivery take?", "Usually two to five business days.", 0),
        ("Can I return a product?", "Yes, within 30 days of delivery.", 1),
    ];
    for (question, answer, sort_order) in faqs {
        sqlx::query(
            "INSERT INTO faqs (id, question, answer, sort_order) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(question)
        .bind(answer)
        .bind(sort_order)
        .execute(pool)
        .await?;
    }

    println!("Seeded FAQs");
    Ok(())
}
