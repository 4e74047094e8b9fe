//! Local persistence source
//!
//! [`LocalStore`] keeps JSON documents in named slots of the local database:
//! - `use_local_storage` - the persisted local-mode toggle
//! - `local_site_content` - array of content blocks
//! - `local_navigation_items` - array of navigation items
//!
//! A missing slot reads as empty. A slot holding text that no longer parses
//! is an error for [`LocalStore::get`]; [`LocalSource`] logs it and shows
//! nothing, but refuses to overwrite it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ContentSource, SourceError, SourceResult};
use crate::db::repositories::LocalStorageRepository;
use crate::models::{
    default_navigation, ContentBlock, ContentPatch, ContentQuery, CreateContentInput,
    CreateNavigationInput, NavigationItem, NavigationPatch,
};

pub const KEY_USE_LOCAL_STORAGE: &str = "use_local_storage";
pub const KEY_SITE_CONTENT: &str = "local_site_content";
pub const KEY_NAVIGATION: &str = "local_navigation_items";

/// JSON key-value layer over the local storage repository
#[derive(Clone)]
pub struct LocalStore {
    repo: Arc<dyn LocalStorageRepository>,
}

impl LocalStore {
    pub fn new(repo: Arc<dyn LocalStorageRepository>) -> Self {
        Self { repo }
    }

    /// Read a slot
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let Some(entry) = self.repo.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&entry.value)
            .with_context(|| format!("Local storage slot {} is corrupt", key))?;
        Ok(Some(value))
    }

    pub async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.repo.set(key, &value.to_string()).await
    }

    /// Persisted local-mode toggle; false when never set
    pub async fn use_local_storage(&self) -> bool {
        match self.get(KEY_USE_LOCAL_STORAGE).await {
            Ok(Some(Value::Bool(enabled))) => enabled,
            Ok(Some(Value::String(s))) => s == "true",
            Ok(_) => false,
            Err(e) => {
                tracing::warn!("Failed to read local storage toggle: {}", e);
                false
            }
        }
    }

    pub async fn set_use_local_storage(&self, enabled: bool) -> Result<()> {
        self.set(KEY_USE_LOCAL_STORAGE, &Value::Bool(enabled)).await
    }

    /// Read a list slot for display. Every failure degrades to an empty list.
    pub async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let value = match self.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read local storage slot {}: {}", key, e);
                return Vec::new();
            }
        };
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Local storage slot {} has unexpected shape: {}", key, e);
            Vec::new()
        })
    }

    /// Read a list slot before modifying it. Corruption is an error here so a
    /// write never silently discards what was stored.
    async fn load_list_for_update<T: DeserializeOwned>(&self, key: &str) -> SourceResult<Vec<T>> {
        let entry = self.repo.get(key).await.map_err(storage_error)?;
        match entry {
            None => Ok(Vec::new()),
            Some(entry) => serde_json::from_str(&entry.value).map_err(|e| {
                SourceError::Storage(format!("slot {} is corrupt: {}", key, e))
            }),
        }
    }

    async fn store_list<T: Serialize>(&self, key: &str, items: &[T]) -> SourceResult<()> {
        let value = serde_json::to_value(items).map_err(|e| SourceError::Storage(e.to_string()))?;
        self.set(key, &value).await.map_err(storage_error)
    }

    /// Write the default navigation when none is stored yet.
    ///
    /// Returns whether anything was written.
    pub async fn seed_defaults(&self) -> Result<bool> {
        if self.repo.get(KEY_NAVIGATION).await?.is_some() {
            return Ok(false);
        }
        let items: Vec<NavigationItem> = default_navigation()
            .into_iter()
            .map(|input| input.into_item(new_id()))
            .collect();
        self.set(KEY_NAVIGATION, &serde_json::to_value(&items)?).await?;
        tracing::info!("Seeded {} default navigation items", items.len());
        Ok(true)
    }
}

fn storage_error(e: anyhow::Error) -> SourceError {
    SourceError::Storage(e.to_string())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Content source backed by [`LocalStore`]
pub struct LocalSource {
    store: LocalStore,
    write_lock: Mutex<()>,
}

impl LocalSource {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ContentSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_content(&self, query: &ContentQuery) -> SourceResult<Vec<ContentBlock>> {
        let blocks: Vec<ContentBlock> = self.store.load_list(KEY_SITE_CONTENT).await;
        Ok(blocks.into_iter().filter(|b| query.matches(b)).collect())
    }

    async fn create_content(&self, input: &CreateContentInput) -> SourceResult<ContentBlock> {
        let _guard = self.write_lock.lock().await;
        let mut blocks: Vec<ContentBlock> =
            self.store.load_list_for_update(KEY_SITE_CONTENT).await?;
        let block = input.clone().into_block(new_id());
        blocks.push(block.clone());
        self.store.store_list(KEY_SITE_CONTENT, &blocks).await?;
        Ok(block)
    }

    async fn update_content(&self, id: &str, patch: &ContentPatch) -> SourceResult<ContentBlock> {
        let _guard = self.write_lock.lock().await;
        let mut blocks: Vec<ContentBlock> =
            self.store.load_list_for_update(KEY_SITE_CONTENT).await?;
        let block = blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| SourceError::NotFound(format!("content {}", id)))?;
        patch.apply_to(block);
        let updated = block.clone();
        self.store.store_list(KEY_SITE_CONTENT, &blocks).await?;
        Ok(updated)
    }

    async fn list_navigation(&self) -> SourceResult<Vec<NavigationItem>> {
        Ok(self.store.load_list(KEY_NAVIGATION).await)
    }

    async fn create_navigation(
        &self,
        input: &CreateNavigationInput,
    ) -> SourceResult<NavigationItem> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<NavigationItem> =
            self.store.load_list_for_update(KEY_NAVIGATION).await?;
        let item = input.clone().into_item(new_id());
        items.push(item.clone());
        self.store.store_list(KEY_NAVIGATION, &items).await?;
        Ok(item)
    }

    async fn update_navigation(
        &self,
        id: &str,
        patch: &NavigationPatch,
    ) -> SourceResult<NavigationItem> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<NavigationItem> =
            self.store.load_list_for_update(KEY_NAVIGATION).await?;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| SourceError::NotFound(format!("navigation item {}", id)))?;
        patch.apply_to(item);
        let updated = item.clone();
        self.store.store_list(KEY_NAVIGATION, &items).await?;
        Ok(updated)
    }

    async fn delete_navigation(&self, id: &str) -> SourceResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<NavigationItem> =
            self.store.load_list_for_update(KEY_NAVIGATION).await?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(SourceError::NotFound(format!("navigation item {}", id)));
        }
        self.store.store_list(KEY_NAVIGATION, &items).await
    }
}
