//! Gallery image model

use serde::{Deserialize, Serialize};

use super::flexible_id;

/// Image record. `url` is the only required field; `is_published` gates the
/// public gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Input for creating an image record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImageInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Partial update for an image record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_minimal_record() {
        let image: Image =
            serde_json::from_value(json!({"id": "img-1", "url": "/uploads/a.jpg"})).unwrap();
        assert!(!image.is_published);
        assert!(image.metadata.is_null());
        assert!(image.title.is_none());
    }
}
