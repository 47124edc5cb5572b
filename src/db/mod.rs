use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::time::Duration;

pub mod order_store;
pub mod user_store;

pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
pub async fn init_db_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    // Create the database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        tracing::info!("Creating database {}", database_url);
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    setup_database(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory pool, kept alive for the pool's lifetime
pub async fn init_memory_pool() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await?;

    setup_database(&pool).await?;

    Ok(pool)
}

/// Set up the database schema
async fn setup_database(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            role INTEGER NOT NULL,
            client_code TEXT,
            client_name TEXT NOT NULL,
            last_edit TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS carpet_orders (
            id TEXT PRIMARY KEY NOT NULL,
            order_number TEXT NOT NULL UNIQUE,
            client_code TEXT NOT NULL,
            design TEXT NOT NULL,
            size TEXT NOT NULL,
            status TEXT,
            order_issued TEXT,
            delivery_date TEXT,
            has_delay INTEGER NOT NULL DEFAULT 0,
            delay_reason TEXT,
            last_edit TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_carpet_orders_client ON carpet_orders (client_code COLLATE NOCASE);",
    )
    .execute(pool)
    .await?;

    Ok(())
}
