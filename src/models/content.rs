//! Content block model
//!
//! A content block is a titled unit of page copy keyed by `(page, section)`.
//! The free-form `content` payload is a restricted JSON union, validated where
//! it enters the system (admin form submission) rather than trusted afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::{clearable, flexible_id};

/// A JSON value restricted to the shapes content payloads may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ContentValue>),
    Map(BTreeMap<String, ContentValue>),
}

impl From<serde_json::Value> for ContentValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<ContentValue> for serde_json::Value {
    fn from(value: ContentValue) -> Self {
        match value {
            ContentValue::Null => Self::Null,
            ContentValue::Bool(b) => Self::Bool(b),
            ContentValue::Number(n) => Self::Number(n),
            ContentValue::String(s) => Self::String(s),
            ContentValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            ContentValue::Map(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Why a submitted content payload was rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ContentFieldsError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Content must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Free-form per-section content: string keys mapped to [`ContentValue`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFields(BTreeMap<String, ContentValue>);

impl ContentFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ContentValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ContentValue) -> Option<ContentValue> {
        self.0.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContentValue)> {
        self.0.iter()
    }
}

impl TryFrom<serde_json::Value> for ContentFields {
    type Error = ContentFieldsError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(k, v)| (k, ContentValue::from(v)))
                    .collect(),
            )),
            serde_json::Value::Null => Err(ContentFieldsError::NotAnObject("null")),
            serde_json::Value::Bool(_) => Err(ContentFieldsError::NotAnObject("a boolean")),
            serde_json::Value::Number(_) => Err(ContentFieldsError::NotAnObject("a number")),
            serde_json::Value::String(_) => Err(ContentFieldsError::NotAnObject("a string")),
            serde_json::Value::Array(_) => Err(ContentFieldsError::NotAnObject("an array")),
        }
    }
}

impl FromStr for ContentFields {
    type Err = ContentFieldsError;

    /// Parse JSON text pasted into an admin form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| ContentFieldsError::InvalidJson(e.to_string()))?;
        Self::try_from(value)
    }
}

/// Content block entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub page: String,
    pub section: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_fields")]
    pub content: ContentFields,
}

/// Stores hand back `null` for an unset content column.
fn lenient_fields<'de, D>(deserializer: D) -> Result<ContentFields, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<ContentFields>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Logical query for content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentQuery {
    pub page: String,
    #[serde(default)]
    pub section: Option<String>,
}

impl ContentQuery {
    pub fn page(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            section: None,
        }
    }

    pub fn section(page: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            section: Some(section.into()),
        }
    }

    /// Whether a block belongs to this query.
    pub fn matches(&self, block: &ContentBlock) -> bool {
        block.page == self.page
            && self
                .section
                .as_deref()
                .map_or(true, |section| block.section == section)
    }
}

/// Input for creating a content block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentInput {
    pub page: String,
    pub section: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub content: ContentFields,
}

impl CreateContentInput {
    pub fn into_block(self, id: String) -> ContentBlock {
        ContentBlock {
            id,
            page: self.page,
            section: self.section,
            title: self.title,
            subtitle: self.subtitle,
            description: self.description,
            image_url: self.image_url,
            content: self.content,
        }
    }
}

/// Partial update for a content block.
///
/// Absent fields are left alone. The optional text fields take `null` to
/// clear the stored value; that `null` is forwarded to the sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentFields>,
}

impl ContentPatch {
    pub fn apply_to(&self, block: &mut ContentBlock) {
        if let Some(title) = &self.title {
            block.title = title.clone();
        }
        if let Some(subtitle) = &self.subtitle {
            block.subtitle = subtitle.clone();
        }
        if let Some(description) = &self.description {
            block.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            block.image_url = image_url.clone();
        }
        if let Some(content) = &self.content {
            block.content = content.clone();
        }
    }
}
