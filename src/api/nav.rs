//! Navigation API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::api::common::{require_text, ItemResponse, ItemsResponse};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{sort_navigation, CreateNavigationInput, NavigationPatch};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_nav_items).post(create_nav_item))
        .route("/{id}", put(update_nav_item).delete(delete_nav_item))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_active_nav_items))
}

/// GET /api/v1/nav - active items in display order
async fn list_active_nav_items(State(state): State<AppState>) -> impl IntoResponse {
    let mut items = state.resolver.resolve_navigation().await;
    items.retain(|item| item.is_active);
    sort_navigation(&mut items);
    Json(ItemsResponse { items })
}

/// GET /api/v1/admin/nav - every item, hidden ones included
async fn list_nav_items(State(state): State<AppState>) -> impl IntoResponse {
    let mut items = state.resolver.resolve_navigation().await;
    sort_navigation(&mut items);
    Json(ItemsResponse { items })
}

async fn create_nav_item(
    State(state): State<AppState>,
    Json(input): Json<CreateNavigationInput>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("title", &input.title)?;
    require_text("path", &input.path)?;
    let item = state.resolver.create_navigation(&input).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

async fn update_nav_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<NavigationPatch>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(title) = &patch.title {
        require_text("title", title)?;
    }
    if let Some(path) = &patch.path {
        require_text("path", path)?;
    }
    let item = state.resolver.update_navigation(&id, &patch).await?;
    Ok(Json(ItemResponse { item }))
}

async fn delete_nav_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.resolver.delete_navigation(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
