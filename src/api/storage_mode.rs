//! Local storage mode endpoints
//!
//! The toggle is persisted immediately but the source chain is assembled at
//! startup, so a change only takes effect after a restart.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_storage_mode).put(set_storage_mode))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageModeResponse {
    /// Persisted toggle
    pub use_local_storage: bool,
    /// Mode the running process resolved at startup
    pub active: bool,
    /// Value forced by configuration, overriding the toggle
    pub configured: Option<bool>,
    pub restart_required: bool,
}

#[derive(Debug, Deserialize)]
pub struct StorageModeRequest {
    pub use_local_storage: bool,
}

async fn current(state: &AppState) -> StorageModeResponse {
    let persisted = state.local_store.use_local_storage().await;
    let effective = state.local_mode_configured.unwrap_or(persisted);
    StorageModeResponse {
        use_local_storage: persisted,
        active: state.local_mode,
        configured: state.local_mode_configured,
        restart_required: effective != state.local_mode,
    }
}

/// GET /api/v1/admin/storage-mode
async fn get_storage_mode(State(state): State<AppState>) -> impl IntoResponse {
    Json(current(&state).await)
}

/// PUT /api/v1/admin/storage-mode
async fn set_storage_mode(
    State(state): State<AppState>,
    Json(request): Json<StorageModeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .local_store
        .set_use_local_storage(request.use_local_storage)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to save storage mode: {:#}", e)))?;

    if state.local_mode_configured.is_some() {
        tracing::warn!("Storage mode saved but content.use_local_storage in config overrides it");
    } else {
        tracing::info!(
            "Storage mode set to {}; restart to apply",
            if request.use_local_storage { "local" } else { "remote" }
        );
    }

    Ok(Json(current(&state).await))
}
