//! Gallery image API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::api::common::{require_text, ItemResponse, ItemsResponse};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateImageInput, ImagePatch};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_published_images))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_images).post(create_image))
        .route("/{id}", put(update_image).delete(delete_image))
}

/// GET /api/v1/gallery
async fn list_published_images(State(state): State<AppState>) -> impl IntoResponse {
    let items = state.resolver.resolve_images(true).await;
    Json(ItemsResponse { items })
}

/// GET /api/v1/admin/images
async fn list_images(State(state): State<AppState>) -> impl IntoResponse {
    let items = state.resolver.resolve_images(false).await;
    Json(ItemsResponse { items })
}

async fn create_image(
    State(state): State<AppState>,
    Json(input): Json<CreateImageInput>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("url", &input.url)?;
    let item = state.resolver.create_image(&input).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ImagePatch>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(url) = &patch.url {
        require_text("url", url)?;
    }
    let item = state.resolver.update_image(&id, &patch).await?;
    Ok(Json(ItemResponse { item }))
}

async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.resolver.delete_image(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
