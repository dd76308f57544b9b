use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillify_database::{create_pool, run_migrations};
use skillify_marketplace::{build_app, store::PgStore, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillify_marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let db_pool = create_pool(&config.database)
        .await
        .context("failed to connect to database")?;

    // Run migrations
    run_migrations(&db_pool)
        .await
        .context("failed to run migrations")?;

    let state = AppState::new(Arc::new(PgStore::new(db_pool)), config.clone());
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        environment = %config.environment,
        "Skillify marketplace listening on {}",
        addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}
