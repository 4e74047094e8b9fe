//! Content block API endpoints
//!
//! Public reads go through the resolver's fall-through chain. Admin forms may
//! send the free-form payload either as a JSON object (`content`) or as JSON
//! text pasted into a textarea (`content_json`); both are validated here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{require_text, ItemResponse, ItemsResponse};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{clearable, ContentFields, ContentPatch, ContentQuery, CreateContentInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_content))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_content))
        .route("/{id}", put(update_content))
}

#[derive(Debug, Deserialize)]
struct ContentParams {
    page: Option<String>,
    section: Option<String>,
}

/// Content submitted by the admin dashboard
#[derive(Debug, Deserialize)]
struct ContentForm {
    page: Option<String>,
    section: Option<String>,
    title: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    subtitle: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    image_url: Option<Option<String>>,
    content: Option<serde_json::Value>,
    content_json: Option<String>,
}

impl ContentForm {
    /// Validated content payload, if one was sent
    fn fields(&mut self) -> Result<Option<ContentFields>, ApiError> {
        let parsed = match (self.content.take(), self.content_json.take()) {
            (Some(value), _) => ContentFields::try_from(value).map(Some),
            (None, Some(text)) => text.parse::<ContentFields>().map(Some),
            (None, None) => Ok(None),
        };
        parsed.map_err(|e| ApiError::validation_error(e.to_string()))
    }
}

/// GET /api/v1/content?page=home&section=hero
async fn list_content(
    State(state): State<AppState>,
    Query(params): Query<ContentParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .page
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::validation_error("page is required"))?;
    let query = ContentQuery {
        page,
        section: params.section.filter(|s| !s.trim().is_empty()),
    };

    let items = state.resolver.resolve_content(&query).await;
    Ok(Json(ItemsResponse { items }))
}

/// POST /api/v1/admin/content
async fn create_content(
    State(state): State<AppState>,
    Json(mut form): Json<ContentForm>,
) -> Result<impl IntoResponse, ApiError> {
    let content = form.fields()?.unwrap_or_default();
    let page = form.page.unwrap_or_default();
    let section = form.section.unwrap_or_default();
    let title = form.title.unwrap_or_default();
    require_text("page", &page)?;
    require_text("section", &section)?;
    require_text("title", &title)?;

    let input = CreateContentInput {
        page,
        section,
        title,
        subtitle: form.subtitle.flatten(),
        description: form.description.flatten(),
        image_url: form.image_url.flatten(),
        content,
    };
    let item = state.resolver.create_content(&input).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

/// PUT /api/v1/admin/content/{id}
///
/// `null` for `subtitle`, `description` or `image_url` clears it.
async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut form): Json<ContentForm>,
) -> Result<impl IntoResponse, ApiError> {
    let content = form.fields()?;
    if let Some(title) = &form.title {
        require_text("title", title)?;
    }

    let patch = ContentPatch {
        title: form.title,
        subtitle: form.subtitle,
        description: form.description,
        image_url: form.image_url,
        content,
    };
    let item = state.resolver.update_content(&id, &patch).await?;
    Ok(Json(ItemResponse { item }))
}
