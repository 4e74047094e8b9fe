//! Maison - content service for a fashion brand's site
//!
//! Site content is read through an ordered chain of sources (headless CMS,
//! table store, local persistence) where the first non-empty answer wins. When
//! every source fails or is empty the read yields an empty collection.
//! Uploaded images are compressed before they are stored, and products come
//! from a storefront or mock catalog.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod sources;
