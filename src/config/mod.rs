//! Configuration management
//!
//! This module handles loading and parsing configuration for the Maison content service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Local persistence database
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Admin dashboard access
    #[serde(default)]
    pub admin: AdminConfig,
    /// Content sources
    #[serde(default)]
    pub content: ContentConfig,
    /// Image compression
    #[serde(default)]
    pub image: ImageConfig,
    /// Product catalog
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the front-end)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration (SQLite file backing the local store)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path, `sqlite:` URL or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/maison.db".to_string()
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// URL prefix the upload directory is served under
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Maximum file size in bytes before compression (default: 20MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            public_prefix: default_public_prefix(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_file_size() -> u64 {
    20 * 1024 * 1024 // 20MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Admin dashboard access
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token required on admin routes. Admin routes are closed when unset.
    #[serde(default)]
    pub token: Option<String>,
}

/// Headless CMS flavour used by the primary source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CmsProvider {
    #[default]
    Strapi,
    Contentful,
    Sanity,
}

impl std::fmt::Display for CmsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strapi => write!(f, "strapi"),
            Self::Contentful => write!(f, "contentful"),
            Self::Sanity => write!(f, "sanity"),
        }
    }
}

/// Collection (content type) names in the headless CMS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionNames {
    #[serde(default = "default_content_collection")]
    pub content: String,
    #[serde(default = "default_navigation_collection")]
    pub navigation: String,
    #[serde(default = "default_categories_collection")]
    pub categories: String,
    #[serde(default = "default_images_collection")]
    pub images: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            content: default_content_collection(),
            navigation: default_navigation_collection(),
            categories: default_categories_collection(),
            images: default_images_collection(),
        }
    }
}

fn default_content_collection() -> String {
    "site-contents".to_string()
}

fn default_navigation_collection() -> String {
    "navigation-items".to_string()
}

fn default_categories_collection() -> String {
    "categories".to_string()
}

fn default_images_collection() -> String {
    "images".to_string()
}

/// Primary (headless CMS) source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimarySourceConfig {
    #[serde(default)]
    pub provider: CmsProvider,
    /// API root, e.g. `https://cms.example.com` or
    /// `https://cdn.contentful.com/spaces/<space>/environments/master`
    pub base_url: String,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Sanity dataset name
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default)]
    pub collections: CollectionNames,
}

fn default_dataset() -> String {
    "production".to_string()
}

/// Secondary (table store) source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondarySourceConfig {
    /// Project URL; tables live under `<base_url>/rest/v1/`
    pub base_url: String,
    /// API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Content source chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub primary: Option<PrimarySourceConfig>,
    #[serde(default)]
    pub secondary: Option<SecondarySourceConfig>,
    /// Forces local persistence on or off. When unset the persisted
    /// `use_local_storage` toggle decides.
    #[serde(default)]
    pub use_local_storage: Option<bool>,
    /// Transport timeout for source requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            primary: None,
            secondary: None,
            use_local_storage: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    15
}

/// Image compression settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Longest allowed side after compression
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Encoding quality in (0, 1]
    #[serde(default = "default_quality")]
    pub quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            quality: default_quality(),
        }
    }
}

fn default_max_dimension() -> u32 {
    1920
}

fn default_quality() -> f32 {
    0.7
}

/// Product catalog backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogDriver {
    /// Built-in mock products (default)
    #[default]
    Mock,
    /// GraphQL storefront API
    Storefront,
}

/// Product catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub driver: CatalogDriver,
    /// GraphQL endpoint of the storefront
    #[serde(default)]
    pub storefront_url: Option<String>,
    /// Storefront access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Upper bound on products fetched per refresh
    #[serde(default = "default_max_products")]
    pub max_products: u32,
    /// How long a fetched product list is reused
    #[serde(default = "default_catalog_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            driver: CatalogDriver::default(),
            storefront_url: None,
            access_token: None,
            max_products: default_max_products(),
            cache_ttl_seconds: default_catalog_ttl(),
        }
    }
}

fn default_max_products() -> u32 {
    250
}

fn default_catalog_ttl() -> u64 {
    300
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - MAISON_SERVER_HOST
    /// - MAISON_SERVER_PORT
    /// - MAISON_SERVER_CORS_ORIGIN
    /// - MAISON_DATABASE_URL
    /// - MAISON_ADMIN_TOKEN
    /// - MAISON_USE_LOCAL_STORAGE
    /// - MAISON_PRIMARY_TOKEN
    /// - MAISON_SECONDARY_URL
    /// - MAISON_SECONDARY_API_KEY
    /// - MAISON_CATALOG_DRIVER
    /// - MAISON_STOREFRONT_URL
    /// - MAISON_STOREFRONT_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MAISON_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MAISON_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("MAISON_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("MAISON_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(token) = std::env::var("MAISON_ADMIN_TOKEN") {
            self.admin.token = Some(token);
        }

        if let Ok(flag) = std::env::var("MAISON_USE_LOCAL_STORAGE") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.content.use_local_storage = Some(true),
                "0" | "false" | "no" => self.content.use_local_storage = Some(false),
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(token) = std::env::var("MAISON_PRIMARY_TOKEN") {
            if let Some(primary) = self.content.primary.as_mut() {
                primary.token = Some(token);
            }
        }
        if let Ok(url) = std::env::var("MAISON_SECONDARY_URL") {
            match self.content.secondary.as_mut() {
                Some(secondary) => secondary.base_url = url,
                None => {
                    self.content.secondary = Some(SecondarySourceConfig {
                        base_url: url,
                        api_key: None,
                    })
                }
            }
        }
        if let Ok(key) = std::env::var("MAISON_SECONDARY_API_KEY") {
            if let Some(secondary) = self.content.secondary.as_mut() {
                secondary.api_key = Some(key);
            }
        }

        if let Ok(driver) = std::env::var("MAISON_CATALOG_DRIVER") {
            match driver.to_lowercase().as_str() {
                "mock" => self.catalog.driver = CatalogDriver::Mock,
                "storefront" => self.catalog.driver = CatalogDriver::Storefront,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("MAISON_STOREFRONT_URL") {
            self.catalog.storefront_url = Some(url);
        }
        if let Ok(token) = std::env::var("MAISON_STOREFRONT_TOKEN") {
            self.catalog.access_token = Some(token);
        }
    }

    /// Reject values that parse but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "image.max_dimension must be greater than 0".to_string(),
            ));
        }
        if !(self.image.quality > 0.0 && self.image.quality <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "image.quality must be in (0, 1], got {}",
                self.image.quality
            )));
        }
        if self.catalog.driver == CatalogDriver::Storefront && self.catalog.storefront_url.is_none()
        {
            return Err(ConfigError::ValidationError(
                "catalog.storefront_url is required for the storefront driver".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
