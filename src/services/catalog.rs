//! Product catalog
//!
//! The shop pages ask one question of the catalog: a filtered, sorted page of
//! products plus facets. Two backends answer it:
//! - [`StorefrontCatalog`] - a GraphQL storefront API, product list cached in memory
//! - [`MockCatalog`] - in-process sample data for development
//!
//! Both hand the full product list to [`build_page`], so filtering, sorting,
//! pagination and facets behave identically.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::MemoryCache;
use crate::config::{CatalogConfig, CatalogDriver};
use crate::models::{
    CategoryFacet, Facets, Pagination, PriceRange, Product, ProductPage, ProductQuery,
    ProductSort,
};

const PRODUCTS_CACHE_KEY: &str = "products";
const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog returned an error: {0}")]
    Upstream(String),

    #[error("Malformed catalog response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

/// Read-only product catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError>;
}

/// Build the configured catalog backend
pub fn build_catalog(
    config: &CatalogConfig,
    timeout: Duration,
) -> Result<Arc<dyn CatalogSource>, CatalogError> {
    match config.driver {
        CatalogDriver::Mock => Ok(Arc::new(MockCatalog::sample())),
        CatalogDriver::Storefront => Ok(Arc::new(StorefrontCatalog::new(config, timeout)?)),
    }
}

fn matches_search(product: &Product, needle: &str) -> bool {
    product.title.to_lowercase().contains(needle)
        || product.handle.to_lowercase().contains(needle)
        || product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

/// Filter, facet, sort and paginate a product list.
///
/// Category counts cover the search-filtered products regardless of the
/// category filter, so the UI can offer every category the search matched.
/// The price range covers the fully filtered products.
pub fn build_page(products: &[Product], query: &ProductQuery) -> ProductPage {
    let query = query.clone().normalized();
    let needle = query.search.as_deref().map(str::to_lowercase);

    let searched: Vec<&Product> = products
        .iter()
        .filter(|p| needle.as_deref().map_or(true, |n| matches_search(p, n)))
        .collect();

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for product in &searched {
        *counts.entry(product.category.as_str()).or_default() += 1;
    }
    let categories = counts
        .into_iter()
        .map(|(category, count)| CategoryFacet {
            category: category.to_string(),
            count,
        })
        .collect();

    let mut filtered: Vec<&Product> = searched
        .into_iter()
        .filter(|p| {
            query
                .category
                .as_deref()
                .map_or(true, |c| p.category.eq_ignore_ascii_case(c))
        })
        .collect();

    let price_range = filtered.iter().map(|p| p.price).fold(None, |range, price| {
        Some(match range {
            None => PriceRange {
                min: price,
                max: price,
            },
            Some(PriceRange { min, max }) => PriceRange {
                min: min.min(price),
                max: max.max(price),
            },
        })
    });

    match query.sort {
        ProductSort::PriceAsc => {
            filtered.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.id.cmp(&b.id)))
        }
        ProductSort::PriceDesc => {
            filtered.sort_by(|a, b| b.price.total_cmp(&a.price).then_with(|| a.id.cmp(&b.id)))
        }
        ProductSort::Newest => filtered
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))),
    }

    let total = filtered.len() as u64;
    let offset = (query.page as usize - 1).saturating_mul(query.limit as usize);
    let products = filtered
        .into_iter()
        .skip(offset)
        .take(query.limit as usize)
        .cloned()
        .collect();

    ProductPage {
        products,
        pagination: Pagination::new(query.page, query.limit, total),
        facets: Facets {
            categories,
            price_range,
        },
    }
}

/// In-process catalog
pub struct MockCatalog {
    products: Vec<Product>,
}

impl MockCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// A small seasonal collection
    pub fn sample() -> Self {
        let day = |d: u32| -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 3, d, 10, 0, 0)
                .single()
                .unwrap_or_default()
        };
        let product = |id: &str, title: &str, category: &str, price: f64, created: u32| Product {
            id: format!("mock-{}", id),
            handle: crate::models::generate_slug(title),
            title: title.to_string(),
            description: None,
            category: category.to_string(),
            price,
            currency: "EUR".to_string(),
            image_url: Some(format!("/uploads/sample/{}.jpg", id)),
            created_at: day(created),
            available: true,
        };

        Self::new(vec![
            product("1", "Silk Slip Dress", "dresses", 420.0, 1),
            product("2", "Pleated Midi Dress", "dresses", 380.0, 4),
            product("3", "Wool Tailored Blazer", "outerwear", 690.0, 2),
            product("4", "Cashmere Wrap Coat", "outerwear", 1250.0, 9),
            product("5", "Linen Wide Trousers", "trousers", 240.0, 6),
            product("6", "Leather Shoulder Bag", "accessories", 560.0, 8),
            product("7", "Pearl Drop Earrings", "accessories", 180.0, 3),
            product("8", "Organza Evening Gown", "dresses", 1890.0, 12),
        ])
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        Ok(build_page(&self.products, query))
    }
}

const PRODUCTS_QUERY: &str = r#"
query Products($first: Int!) {
  products(first: $first, sortKey: CREATED_AT, reverse: true) {
    edges {
      node {
        id
        handle
        title
        description
        productType
        createdAt
        availableForSale
        priceRange { minVariantPrice { amount currencyCode } }
        featuredImage { url }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ProductsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection,
}

#[derive(Debug, Deserialize)]
struct Connection {
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: ProductNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    handle: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default = "available_default")]
    available_for_sale: bool,
    price_range: PriceRangeNode,
    #[serde(default)]
    featured_image: Option<ImageNode>,
}

fn available_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceRangeNode {
    min_variant_price: MoneyNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyNode {
    amount: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct ImageNode {
    url: String,
}

impl TryFrom<ProductNode> for Product {
    type Error = CatalogError;

    fn try_from(node: ProductNode) -> Result<Self, Self::Error> {
        let money = node.price_range.min_variant_price;
        let price = money.amount.parse::<f64>().map_err(|e| {
            CatalogError::Malformed(format!("price {:?} of {}: {}", money.amount, node.id, e))
        })?;
        let category = node
            .product_type
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        Ok(Product {
            id: node.id,
            handle: node.handle,
            title: node.title,
            description: node.description.filter(|d| !d.is_empty()),
            category,
            price,
            currency: money.currency_code,
            image_url: node.featured_image.map(|i| i.url),
            created_at: node.created_at,
            available: node.available_for_sale,
        })
    }
}

/// GraphQL storefront client
pub struct StorefrontCatalog {
    client: reqwest::Client,
    url: String,
    access_token: Option<String>,
    max_products: u32,
    cache: MemoryCache<Vec<Product>>,
}

impl StorefrontCatalog {
    pub fn new(config: &CatalogConfig, timeout: Duration) -> Result<Self, CatalogError> {
        let url = config.storefront_url.clone().ok_or_else(|| {
            CatalogError::Unavailable("no storefront URL configured".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            access_token: config.access_token.clone(),
            max_products: config.max_products,
            cache: MemoryCache::new(1, Duration::from_secs(config.cache_ttl_seconds)),
        })
    }

    async fn fetch_all(&self) -> Result<Vec<Product>, CatalogError> {
        let mut request = self.client.post(&self.url).json(&json!({
            "query": PRODUCTS_QUERY,
            "variables": { "first": self.max_products },
        }));
        if let Some(token) = &self.access_token {
            request = request.header("X-Shopify-Storefront-Access-Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Upstream(format!("status {}: {}", status, body)));
        }

        let body: GraphQlResponse = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(CatalogError::Upstream(messages.join("; ")));
        }
        let data = body
            .data
            .ok_or_else(|| CatalogError::Malformed("response has no data".to_string()))?;

        let products = data
            .products
            .edges
            .into_iter()
            .map(|edge| Product::try_from(edge.node))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!("Fetched {} products from storefront", products.len());
        Ok(products)
    }
}

#[async_trait]
impl CatalogSource for StorefrontCatalog {
    async fn products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let products = self
            .cache
            .get_or_try_load(PRODUCTS_CACHE_KEY, self.fetch_all())
            .await
            .map_err(|e| (*e).clone())?;
        Ok(build_page(&products, query))
    }
}
