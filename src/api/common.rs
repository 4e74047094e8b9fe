//! Common API utilities and shared types

use serde::{Deserialize, Serialize};

/// `{ "items": [...] }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

/// `{ "item": {...} }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemResponse<T> {
    pub item: T,
}

/// Reject blank required text fields
pub fn require_text(field: &str, value: &str) -> Result<(), crate::api::ApiError> {
    if value.trim().is_empty() {
        return Err(crate::api::ApiError::validation_error(format!(
            "{} is required",
            field
        )));
    }
    Ok(())
}
