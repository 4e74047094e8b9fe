//! Database repositories
//!
//! Repository pattern implementations for database access.

pub mod local_storage;

pub use local_storage::{LocalStorageRepository, SqlxLocalStorageRepository, StoredEntry};
