//! Category API endpoints
//!
//! - GET /api/v1/categories - active categories with their active items
//! - GET /api/v1/categories/{slug} - one category by slug
//! - /api/v1/admin/categories - category and item management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{require_text, ItemResponse, ItemsResponse};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    generate_slug, is_valid_slug, Category, CategoryItemPatch, CategoryPatch,
    CreateCategoryInput, CreateCategoryItemInput,
};

/// Build the public categories router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}", get(get_category))
}

/// Build the admin categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_categories).post(create_category))
        .route("/{id}", put(update_category).delete(delete_category))
        .route("/{id}/items", post(create_category_item))
        .route(
            "/items/{item_id}",
            put(update_category_item).delete(delete_category_item),
        )
}

/// Hide inactive items and order the rest for display
fn prepare_for_display(mut category: Category) -> Category {
    category.items.retain(|item| item.is_active);
    category.items.sort_by_key(|item| item.display_order);
    category
}

/// GET /api/v1/categories
async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    let mut items: Vec<Category> = state
        .resolver
        .resolve_categories()
        .await
        .into_iter()
        .filter(|c| c.is_active)
        .map(prepare_for_display)
        .collect();
    items.sort_by_key(|c| c.display_order);
    Json(ItemsResponse { items })
}

/// GET /api/v1/categories/{slug}
async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .resolver
        .resolve_category(&slug)
        .await
        .filter(|c| c.is_active)
        .map(prepare_for_display)
        .ok_or_else(|| ApiError::not_found(format!("Category not found: {}", slug)))?;
    Ok(Json(ItemResponse { item }))
}

/// GET /api/v1/admin/categories
async fn list_all_categories(State(state): State<AppState>) -> impl IntoResponse {
    let mut items = state.resolver.resolve_categories().await;
    items.sort_by_key(|c| c.display_order);
    Json(ItemsResponse { items })
}

fn check_slug(slug: &str) -> Result<(), ApiError> {
    if !is_valid_slug(slug) {
        return Err(ApiError::validation_error(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            slug
        )));
    }
    Ok(())
}

async fn create_category(
    State(state): State<AppState>,
    Json(mut input): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("title", &input.title)?;
    if input.slug.trim().is_empty() {
        input.slug = generate_slug(&input.title);
    }
    check_slug(&input.slug)?;

    let item = state.resolver.create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(title) = &patch.title {
        require_text("title", title)?;
    }
    if let Some(slug) = &patch.slug {
        check_slug(slug)?;
    }
    let item = state.resolver.update_category(&id, &patch).await?;
    Ok(Json(ItemResponse { item }))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.resolver.delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_category_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut input): Json<CreateCategoryItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("title", &input.title)?;
    require_text("image_path", &input.image_path)?;
    input.category_id = id;

    let item = state.resolver.create_category_item(&input).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

async fn update_category_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(patch): Json<CategoryItemPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.resolver.update_category_item(&item_id, &patch).await?;
    Ok(Json(ItemResponse { item }))
}

async fn delete_category_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.resolver.delete_category_item(&item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
