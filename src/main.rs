//! Volunteer Avenue - backend server

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use volunteer_avenue::{
    api::{self, AppState},
    config::Config,
    db::{self, repositories::SqlxDocumentRepository},
    models::Collection,
    services::{TokenCodec, VolunteerService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "volunteer_avenue=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Volunteer Avenue server...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded (mode: {:?})", config.server.mode);

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories and services
    let posts = SqlxDocumentRepository::boxed(pool.clone(), Collection::VolunteerPosts);
    let requests = SqlxDocumentRepository::boxed(pool.clone(), Collection::VolunteerRequests);
    let token_codec = TokenCodec::from_config(&config.auth).context("Invalid token configuration")?;

    let state = AppState {
        token_codec: Arc::new(token_codec),
        volunteer_service: Arc::new(VolunteerService::new(posts, requests)),
        mode: config.server.mode,
    };

    let app = api::build_router(state, &config.server.cors_origins);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
