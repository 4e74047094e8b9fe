//! Uploaded image storage
//!
//! Compressed uploads land in the configured upload directory under a fresh
//! UUID file name and are served back under the public prefix.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::image::{UploadFile, JPEG_CONTENT_TYPE};
use crate::config::UploadConfig;

/// A file written by [`ImageStorage::store`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub url: String,
    pub size: u64,
}

/// Writes uploads to disk
#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
    public_prefix: String,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.path, &config.public_prefix)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if missing
    pub async fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).await.with_context(|| {
                format!("Failed to create upload directory: {:?}", self.root)
            })?;
        }
        Ok(())
    }

    /// Write `file` under a new unique name and return where it is served.
    pub async fn store(&self, file: &UploadFile) -> Result<StoredFile> {
        self.ensure_dir().await?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension(&file.content_type));
        let path = self.root.join(&filename);
        fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("Failed to save upload {} as {:?}", file.name, path))?;

        tracing::info!("Stored upload {} as {}", file.name, filename);
        Ok(StoredFile {
            url: format!("{}/{}", self.public_prefix, filename),
            size: file.bytes.len() as u64,
            filename,
        })
    }

    /// Delete a file written by [`ImageStorage::store`]
    pub async fn remove(&self, filename: &str) -> Result<()> {
        let path = self.root.join(filename);
        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove upload {:?}", path))
    }
}

fn extension(content_type: &str) -> &'static str {
    match content_type {
        JPEG_CONTENT_TYPE => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}
