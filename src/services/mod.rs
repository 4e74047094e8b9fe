//! Services layer
//!
//! - [`resolver`]: ordered, fall-through content resolution across sources
//! - [`image`]: upload compression
//! - [`storage`]: writing uploads to disk
//! - [`catalog`]: product listing from a storefront or mock data

pub mod catalog;
pub mod image;
pub mod resolver;
pub mod storage;

pub use catalog::{build_catalog, CatalogError, CatalogSource, MockCatalog, StorefrontCatalog};
pub use image::{compress, CompressOptions, Compressed, ImageError, UploadFile};
pub use resolver::{local_mode, ContentResolver, ResolveError};
pub use storage::{ImageStorage, StoredFile};
