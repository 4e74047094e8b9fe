//! Image upload API endpoint
//!
//! `POST /api/v1/admin/images/upload` takes a multipart form with a `file`
//! field and optional `title`, `description` and `is_published` text fields.
//! The image is compressed, written to the upload directory and registered
//! as a gallery image through the resolver.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateImageInput, Image};
use crate::services::image::{compress, Compressed, UploadFile};
use crate::services::storage::StoredFile;

/// Room for multipart boundaries and the text fields
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);
    Router::new()
        .route("/", post(upload_image))
        .layer(DefaultBodyLimit::max(limit))
}

/// Stored file details
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub item: Image,
    pub file: UploadedFile,
}

/// Fields collected from the multipart form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadFile>,
    title: Option<String>,
    description: Option<String>,
    is_published: bool,
}

fn too_large(max_file_size: u64) -> ApiError {
    ApiError::new(
        "PAYLOAD_TOO_LARGE",
        format!(
            "File too large. Maximum size: {} MB",
            max_file_size / 1024 / 1024
        ),
    )
}

/// Body limit hits surface as multipart errors; keep them distinguishable.
fn multipart_error(e: MultipartError, max_file_size: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max_file_size);
    }
    ApiError::validation_error(format!("Failed to read multipart: {}", e))
}

async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let config = &state.upload_config;
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config.max_file_size))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !config.is_type_allowed(&content_type) {
                    return Err(ApiError::validation_error(format!(
                        "Unsupported file type: {}",
                        content_type
                    )));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, config.max_file_size))?;

                if data.len() as u64 > config.max_file_size {
                    return Err(too_large(config.max_file_size));
                }

                form.file = Some(UploadFile {
                    name: filename,
                    content_type,
                    bytes: data.to_vec(),
                });
            }
            "title" | "description" | "is_published" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, config.max_file_size))?;
                let text = text.trim().to_string();
                match name.as_str() {
                    "title" => form.title = Some(text).filter(|t| !t.is_empty()),
                    "description" => form.description = Some(text).filter(|t| !t.is_empty()),
                    _ => form.is_published = matches!(text.as_str(), "true" | "1" | "on"),
                }
            }
            _ => continue,
        }
    }

    Ok(form)
}

/// POST /api/v1/admin/images/upload
async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(&state, multipart).await?;
    let original = form
        .file
        .ok_or_else(|| ApiError::validation_error("No file provided"))?;

    let original_name = original.name.clone();
    let original_type = original.content_type.clone();
    let original_size = original.bytes.len();
    let options = state.compress_options;
    let Compressed { file, dimensions } = tokio::task::spawn_blocking(move || {
        compress(&original.bytes, &original.name, &options)
    })
    .await
    .map_err(|e| ApiError::internal_error(format!("Compression task failed: {}", e)))??;

    let StoredFile {
        filename,
        url,
        size,
    } = state
        .image_storage
        .store(&file)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to save file: {:#}", e)))?;

    let input = CreateImageInput {
        title: form.title.or_else(|| Some(original_name.clone())),
        description: form.description,
        url: url.clone(),
        thumbnail_url: None,
        is_published: form.is_published,
        metadata: serde_json::json!({
            "original_name": original_name,
            "original_content_type": original_type,
            "original_size": original_size,
            "width": dimensions.width,
            "height": dimensions.height,
            "size": size,
            "content_type": file.content_type,
        }),
    };
    let item = match state.resolver.create_image(&input).await {
        Ok(item) => item,
        Err(e) => {
            tracing::warn!("Could not record upload {}: {}", filename, e);
            if let Err(cleanup) = state.image_storage.remove(&filename).await {
                tracing::error!("Orphaned upload left behind: {:#}", cleanup);
            }
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            item,
            file: UploadedFile {
                filename,
                url,
                size,
                content_type: file.content_type,
                width: dimensions.width,
                height: dimensions.height,
            },
        }),
    ))
}
