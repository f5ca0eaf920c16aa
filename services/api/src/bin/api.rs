//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, llama_extract::LlamaExtractAdapter},
    config::{Config, ConfigError},
    error::ApiError,
    web::{self, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(config.database.connect_options()?)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Extraction Adapter ---
    let api_key = config
        .llama_cloud_api_key
        .as_deref()
        .ok_or_else(|| ConfigError::MissingVar("LLAMA_CLOUD_API_KEY".to_string()))?;
    let extractor = Arc::new(
        LlamaExtractAdapter::connect(
            &config.llama_cloud_base_url,
            api_key,
            &config.extraction_agent_name,
            config.extraction_poll_interval,
        )
        .await?,
    );

    // --- 4. Prepare Transient Upload Storage ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // --- 5. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        extractor,
        config: config.clone(),
    });
    let app = web::router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
