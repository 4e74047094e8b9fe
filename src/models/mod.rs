//! Data models
//!
//! This module contains all data structures used throughout the Maison content service.
//! Models represent:
//! - Site entities (ContentBlock, NavigationItem, Category, CategoryItem, Image)
//! - Catalog types (Product, ProductQuery, ProductPage)
//! - Create/patch inputs accepted by the admin API

mod category;
mod content;
mod image;
mod navigation;
mod product;

pub use category::{
    generate_slug, is_valid_slug, Category, CategoryItem, CategoryItemPatch, CategoryPatch,
    CreateCategoryInput, CreateCategoryItemInput,
};
pub use content::{
    ContentBlock, ContentFields, ContentFieldsError, ContentPatch, ContentQuery, ContentValue,
    CreateContentInput,
};
pub use image::{CreateImageInput, Image, ImagePatch};
pub use navigation::{
    default_navigation, sort_navigation, CreateNavigationInput, NavigationItem, NavigationPatch,
};
pub use product::{
    CategoryFacet, Facets, Pagination, PriceRange, Product, ProductPage, ProductQuery,
    ProductSort, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};

use serde::{Deserialize, Deserializer};

/// Accept identifiers encoded as either JSON strings or numbers.
///
/// Headless CMSs and table stores disagree on id types; internally every id is a string.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Tell an absent field from an explicit `null`.
///
/// Paired with `#[serde(default)]`: a missing field stays `None`, `null`
/// becomes `Some(None)` and a value becomes `Some(Some(value))`.
pub(crate) fn clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
