//! Navigation item model

use serde::{Deserialize, Serialize};

use super::flexible_id;

/// A site navigation entry.
///
/// Sources may return these in any order; consumers sort by `display_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationItem {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_external: bool,
}

fn default_true() -> bool {
    true
}

/// Sort navigation items ascending by `display_order`, keeping ties stable.
pub fn sort_navigation(items: &mut [NavigationItem]) {
    items.sort_by_key(|item| item.display_order);
}

/// Input for creating a navigation item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNavigationInput {
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_external: bool,
}

impl CreateNavigationInput {
    pub fn into_item(self, id: String) -> NavigationItem {
        NavigationItem {
            id,
            title: self.title,
            path: self.path,
            display_order: self.display_order,
            is_active: self.is_active,
            is_external: self.is_external,
        }
    }
}

/// Partial update for a navigation item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_external: Option<bool>,
}

impl NavigationPatch {
    pub fn apply_to(&self, item: &mut NavigationItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(path) = &self.path {
            item.path = path.clone();
        }
        if let Some(order) = self.display_order {
            item.display_order = order;
        }
        if let Some(active) = self.is_active {
            item.is_active = active;
        }
        if let Some(external) = self.is_external {
            item.is_external = external;
        }
    }
}

/// Navigation shipped with a fresh local store.
pub fn default_navigation() -> Vec<CreateNavigationInput> {
    [
        ("Home", "/"),
        ("About", "/about"),
        ("Gallery", "/gallery"),
        ("Contact", "/contact"),
        ("Shop", "/shop"),
    ]
    .into_iter()
    .enumerate()
    .map(|(order, (title, path))| CreateNavigationInput {
        title: title.to_string(),
        path: path.to_string(),
        display_order: order as i32,
        is_active: true,
        is_external: false,
    })
    .collect()
}
