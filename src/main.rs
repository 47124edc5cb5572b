use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carpet_order_portal::{
    config::Config,
    db::init_db_pool,
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carpet_order_portal=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = init_db_pool(&config.database_url, config.max_pool_size)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(pool, &config);

    match &config.admin_password {
        Some(password) => {
            state
                .auth
                .ensure_admin(&config.admin_username, password)
                .await
                .context("Failed to create administrator account")?;
        }
        None => tracing::warn!("ADMIN_PASSWORD not set, skipping administrator setup"),
    }

    tracing::info!(vocabulary = ?config.vocabulary, "Using stage vocabulary");

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
