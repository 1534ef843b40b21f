use anyhow::Result;
use std::sync::Arc;
use tracing::info;

mod app;
mod config;
mod error;
mod routes;
mod telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging
    telemetry::init_logging(&config.logging);

    // Initialize Prometheus metrics
    let metrics = telemetry::init_metrics()?;
    info!("Prometheus metrics initialized");

    info!("Starting Fleet Tracker API v{}", env!("CARGO_PKG_VERSION"));

    // Create database pool
    let pool = persistence::db::PoolSettings::from(&config.database)
        .connect()
        .await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Build application over the PostgreSQL store
    let store = Arc::new(persistence::PgStore::new(pool));
    let addr = config.socket_addr();
    let app = app::create_app(config, store, Some(metrics));

    // Start server
    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Handle shutdown gracefully
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
