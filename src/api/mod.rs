//! API layer - HTTP handlers and routing
//!
//! Public endpoints serve the site (content, navigation, categories, gallery,
//! products, health). Admin endpoints sit under `/admin` behind the bearer
//! token check. Uploaded images are served from the upload prefix.

pub mod categories;
pub mod common;
pub mod content;
pub mod gallery;
pub mod middleware;
pub mod nav;
pub mod products;
pub mod site;
pub mod storage_mode;
pub mod upload;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/content", content::router())
        .nest("/nav", nav::router())
        .nest("/categories", categories::router())
        .nest(
            "/images/upload",
            upload::router(state.upload_config.max_file_size),
        )
        .nest("/images", gallery::router())
        .nest("/storage-mode", storage_mode::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .nest("/content", content::public_router())
        .nest("/nav", nav::public_router())
        .nest("/categories", categories::public_router())
        .nest("/gallery", gallery::public_router())
        .nest("/products", products::public_router())
        .nest("/health", site::router())
        .nest("/admin", admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin: {}", cors_origin),
    }

    let prefix = match state.upload_config.public_prefix.trim_end_matches('/') {
        "" => "/uploads".to_string(),
        p if p.starts_with('/') => p.to_string(),
        p => format!("/{}", p),
    };
    let uploads = ServeDir::new(state.image_storage.root());

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service(&prefix, uploads)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
