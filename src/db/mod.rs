//! Database layer
//!
//! SQLite-backed persistence for the local content store. The database holds
//! one key/value table; everything structured above it is JSON.
//!
//! # Usage
//!
//! ```ignore
//! use maison::config::DatabaseConfig;
//! use maison::db::{create_pool, migrations};
//!
//! let db = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&db).await?;
//! db.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, Database};
