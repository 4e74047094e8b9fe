//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Admin authorization (static bearer token)

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::db::Database;
use crate::services::catalog::{CatalogError, CatalogSource};
use crate::services::image::{CompressOptions, ImageError};
use crate::services::resolver::{ContentResolver, ResolveError};
use crate::services::storage::ImageStorage;
use crate::sources::{LocalStore, SourceError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub resolver: Arc<ContentResolver>,
    pub catalog: Arc<dyn CatalogSource>,
    pub local_store: LocalStore,
    pub image_storage: Arc<ImageStorage>,
    pub upload_config: Arc<UploadConfig>,
    pub compress_options: CompressOptions,
    pub admin_token: Option<Arc<str>>,
    /// Local mode as decided at startup
    pub local_mode: bool,
    /// Local mode as forced by configuration, if at all
    pub local_mode_configured: Option<bool>,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new("UPSTREAM_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            "UPSTREAM_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        if e.is_not_found() {
            return Self::not_found(e.to_string());
        }
        match &e {
            ResolveError::NoSources => Self::internal_error(e.to_string()),
            ResolveError::AllSourcesFailed { failures, .. } => {
                let details: Vec<_> = failures
                    .iter()
                    .map(|(source, error)| {
                        serde_json::json!({ "source": source, "error": error.to_string() })
                    })
                    .collect();
                let code = if failures
                    .iter()
                    .all(|(_, error)| matches!(error, SourceError::Unsupported))
                {
                    "VALIDATION_ERROR"
                } else {
                    "UPSTREAM_ERROR"
                };
                Self::with_details(code, e.to_string(), serde_json::Value::Array(details))
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        tracing::warn!("Catalog request failed: {}", e);
        Self::upstream_error(e.to_string())
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Decode(_) | ImageError::InvalidOptions(_) => {
                Self::validation_error(e.to_string())
            }
            ImageError::Encode(_) => Self::internal_error(e.to_string()),
        }
    }
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Admin authorization middleware
///
/// Admin routes stay closed when no admin token is configured.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state
        .admin_token
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Admin access is not configured"))?;

    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing admin token"))?;

    if token != expected {
        return Err(ApiError::unauthorized("Invalid admin token"));
    }

    Ok(next.run(request).await)
}
