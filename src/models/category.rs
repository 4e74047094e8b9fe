//! Category model
//!
//! Categories group gallery/lookbook items. A category's `slug` is the
//! external routing key, so it must be unique and URL-safe.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::flexible_id;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug pattern"));

/// Category entity with its owned items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<CategoryItem>,
}

/// Item inside a category, owned by its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryItem {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(deserialize_with = "flexible_id")]
    pub category_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_path: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<CategoryItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CategoryItem>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Whether `slug` is usable as a URL path segment.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

/// Generate a URL-safe slug from a title.
///
/// Non-ASCII characters are dropped; runs of separators collapse to a single hyphen.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_ascii() {
            pending_hyphen = true;
        }
    }

    slug
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    pub title: String,
    /// Derived from the title when omitted
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update for a category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Input for creating a category item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryItemInput {
    /// Taken from the route when created through the admin API
    #[serde(default)]
    pub category_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_path: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update for a category item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_generate_slug_simple() {
        assert_eq!(generate_slug("Spring Summer 2024"), "spring-summer-2024");
    }

    #[test]
    fn test_generate_slug_punctuation() {
        assert_eq!(generate_slug("  Ready-to-Wear: Evening!  "), "ready-to-wear-evening");
    }

    #[test]
    fn test_generate_slug_drops_non_ascii() {
        assert_eq!(generate_slug("Café Noir"), "caf-noir");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("evening-wear"));
        assert!(is_valid_slug("ss24"));
        assert!(!is_valid_slug("Evening"));
        assert!(!is_valid_slug("evening--wear"));
        assert!(!is_valid_slug("-evening"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_category_with_embedded_items() {
        let category: Category = serde_json::from_value(json!({
            "id": 1,
            "title": "Evening",
            "slug": "evening",
            "display_order": 2,
            "is_active": true,
            "items": [{
                "id": 10,
                "category_id": 1,
                "title": "Silk gown",
                "image_path": "categories/evening/gown.jpg",
                "display_order": 0,
                "is_active": true
            }]
        }))
        .unwrap();

        assert_eq!(category.items.len(), 1);
        assert_eq!(category.items[0].category_id, "1");
    }

    #[test]
    fn test_category_null_items() {
        let category: Category = serde_json::from_value(json!({
            "id": "c1", "title": "Bridal", "slug": "bridal", "items": null
        }))
        .unwrap();
        assert!(category.items.is_empty());
    }

    proptest! {
        #[test]
        fn property_generated_slug_is_valid_or_empty(title in "\\PC{0,40}") {
            let slug = generate_slug(&title);
            prop_assert!(slug.is_empty() || is_valid_slug(&slug));
        }
    }
}
