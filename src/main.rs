//! Maison - content service for a fashion brand's site

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maison::{
    api::{self, AppState},
    config::Config,
    db::{self, repositories::SqlxLocalStorageRepository},
    services::{build_catalog, local_mode, CompressOptions, ContentResolver, ImageStorage},
    sources::LocalStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maison=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Maison content service...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Local persistence and the source chain
    let local_store = LocalStore::new(SqlxLocalStorageRepository::boxed(pool.clone()));
    let use_local = local_mode(config.content.use_local_storage, &local_store).await;
    if use_local {
        local_store.seed_defaults().await?;
    }

    let resolver = ContentResolver::from_config(&config.content, local_store.clone(), use_local)?;
    tracing::info!(
        "Content sources: {} (local mode: {})",
        resolver.source_names().join(" -> "),
        use_local
    );

    // Product catalog
    let catalog = build_catalog(
        &config.catalog,
        Duration::from_secs(config.content.request_timeout_seconds),
    )?;
    tracing::info!("Catalog initialized: {:?}", config.catalog.driver);

    // Upload storage
    let image_storage = ImageStorage::from_config(&config.upload);
    image_storage.ensure_dir().await?;

    let state = AppState {
        db: pool.clone(),
        resolver: Arc::new(resolver),
        catalog,
        local_store,
        image_storage: Arc::new(image_storage),
        upload_config: Arc::new(config.upload.clone()),
        compress_options: CompressOptions::from(&config.image),
        admin_token: config.admin.token.as_deref().map(Arc::from),
        local_mode: use_local,
        local_mode_configured: config.content.use_local_storage,
    };
    if state.admin_token.is_none() {
        tracing::warn!("No admin token configured, admin API is disabled");
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
