//! Content sources
//!
//! Every backend that can hold site content implements [`ContentSource`]:
//! - [`HeadlessCmsSource`] - a headless CMS (Strapi, Contentful or Sanity flavour)
//! - [`TableStoreSource`] - a table-oriented data store spoken to over HTTP
//! - [`LocalSource`] - the local persistence store
//!
//! Operations a backend cannot perform return [`SourceError::Unsupported`],
//! which the resolver treats like an unavailable source.

pub mod headless;
pub mod local;
pub mod table_store;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::{
    Category, CategoryItem, CategoryItemPatch, CategoryPatch, ContentBlock, ContentPatch,
    ContentQuery, CreateCategoryInput, CreateCategoryItemInput, CreateContentInput,
    CreateImageInput, CreateNavigationInput, Image, ImagePatch, NavigationItem, NavigationPatch,
};

pub use headless::HeadlessCmsSource;
pub use local::{LocalSource, LocalStore};
pub use table_store::TableStoreSource;

/// Error returned by a single content source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or transport failure
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a non-success status
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered with something we could not interpret
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The record addressed by a mutation does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backend does not implement this operation
    #[error("operation not supported")]
    Unsupported,

    /// Local persistence failure
    #[error("local storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Rejected {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Capability interface shared by every content backend.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Label used in logs
    fn name(&self) -> &str;

    async fn list_content(&self, _query: &ContentQuery) -> SourceResult<Vec<ContentBlock>> {
        Err(SourceError::Unsupported)
    }

    async fn create_content(&self, _input: &CreateContentInput) -> SourceResult<ContentBlock> {
        Err(SourceError::Unsupported)
    }

    async fn update_content(&self, _id: &str, _patch: &ContentPatch) -> SourceResult<ContentBlock> {
        Err(SourceError::Unsupported)
    }

    async fn list_navigation(&self) -> SourceResult<Vec<NavigationItem>> {
        Err(SourceError::Unsupported)
    }

    async fn create_navigation(
        &self,
        _input: &CreateNavigationInput,
    ) -> SourceResult<NavigationItem> {
        Err(SourceError::Unsupported)
    }

    async fn update_navigation(
        &self,
        _id: &str,
        _patch: &NavigationPatch,
    ) -> SourceResult<NavigationItem> {
        Err(SourceError::Unsupported)
    }

    async fn delete_navigation(&self, _id: &str) -> SourceResult<()> {
        Err(SourceError::Unsupported)
    }

    async fn list_categories(&self) -> SourceResult<Vec<Category>> {
        Err(SourceError::Unsupported)
    }

    async fn category_by_slug(&self, _slug: &str) -> SourceResult<Option<Category>> {
        Err(SourceError::Unsupported)
    }

    async fn create_category(&self, _input: &CreateCategoryInput) -> SourceResult<Category> {
        Err(SourceError::Unsupported)
    }

    async fn update_category(&self, _id: &str, _patch: &CategoryPatch) -> SourceResult<Category> {
        Err(SourceError::Unsupported)
    }

    async fn delete_category(&self, _id: &str) -> SourceResult<()> {
        Err(SourceError::Unsupported)
    }

    async fn create_category_item(
        &self,
        _input: &CreateCategoryItemInput,
    ) -> SourceResult<CategoryItem> {
        Err(SourceError::Unsupported)
    }

    async fn update_category_item(
        &self,
        _id: &str,
        _patch: &CategoryItemPatch,
    ) -> SourceResult<CategoryItem> {
        Err(SourceError::Unsupported)
    }

    async fn delete_category_item(&self, _id: &str) -> SourceResult<()> {
        Err(SourceError::Unsupported)
    }

    async fn list_images(&self, _published_only: bool) -> SourceResult<Vec<Image>> {
        Err(SourceError::Unsupported)
    }

    async fn create_image(&self, _input: &CreateImageInput) -> SourceResult<Image> {
        Err(SourceError::Unsupported)
    }

    async fn update_image(&self, _id: &str, _patch: &ImagePatch) -> SourceResult<Image> {
        Err(SourceError::Unsupported)
    }

    async fn delete_image(&self, _id: &str) -> SourceResult<()> {
        Err(SourceError::Unsupported)
    }
}

/// Build the HTTP client shared by a remote source
pub(crate) fn build_http_client(timeout: Duration) -> SourceResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SourceError::Unavailable(format!("Failed to create HTTP client: {}", e)))
}

/// Read a JSON body, turning non-success statuses into [`SourceError::Rejected`].
pub(crate) async fn read_json(response: reqwest::Response) -> SourceResult<serde_json::Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| error_message(&v))
        .unwrap_or(body);

    Err(SourceError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Pull a human-readable message out of the common error envelopes.
fn error_message(body: &serde_json::Value) -> Option<String> {
    let candidates = [
        body.get("message"),
        body.pointer("/error/message"),
        body.get("error"),
        body.get("description"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
}

/// Decode flattened records, skipping the ones that don't fit the model.
pub(crate) fn decode_records<T: DeserializeOwned>(
    source: &str,
    kind: &str,
    records: Vec<serde_json::Value>,
) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<T>(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("{}: skipping undecodable {} record: {}", source, kind, e);
                None
            }
        })
        .collect()
}

/// Decode a single record returned by a mutation.
pub(crate) fn decode_record<T: DeserializeOwned>(record: serde_json::Value) -> SourceResult<T> {
    serde_json::from_value(record).map_err(|e| SourceError::Malformed(e.to_string()))
}
