//! Service health endpoint

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Content sources in resolution order
    pub sources: Vec<String>,
    pub local_mode: bool,
    pub database: bool,
}

/// GET /api/v1/health
///
/// Always 200: content reads degrade to an empty collection, so a dead
/// database or upstream only downgrades the status.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check: {:#}", e);
            false
        }
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources: state
            .resolver
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        local_mode: state.local_mode,
        database,
    })
}
