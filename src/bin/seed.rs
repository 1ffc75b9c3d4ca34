use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use backoffice_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    let customer_id = ensure_user(&pool, "customer@example.com", "customer123", "customer").await?;
    seed_products(&pool).await?;
    seed_coupon(&pool, admin_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
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
    .fetch_optional(pool)
    .await?;

    row.map(|(id,)| id)
        .ok_or_else(|| anyhow::anyhow!("failed to upsert user {email}"))
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products: [(&str, i64, i32); 3] = [
        ("Ledger Notebook", 1250, 40),
        ("Desk Lamp", 4900, 12),
        ("Thermal Label Roll", 799, 200),
    ];

    for (name, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, currency, stock)
            SELECT $1, $2, $3, $4, 'USD', $5
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(format!("{name} (seeded)"))
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_coupon(pool: &sqlx::PgPool, admin_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons
            (id, name, code, discount_percent, max_uses, expires_at, created_by)
        VALUES ($1, 'Launch discount', 'LAUNCH10', 10, 100, now() + interval '90 days', $2)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .execute(pool)
    .await?;

    Ok(())
}
