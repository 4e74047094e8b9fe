//! Product catalog types
//!
//! The catalog is an external collaborator: these types describe the single
//! read query the shop pages consume and the page of results it returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum page size a caller may request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Default page size
pub const DEFAULT_PAGE_LIMIT: u32 = 12;

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub handle: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Sort order for catalog queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
}

impl std::fmt::Display for ProductSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PriceAsc => write!(f, "price_asc"),
            Self::PriceDesc => write!(f, "price_desc"),
            Self::Newest => write!(f, "newest"),
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            _ => Err(anyhow::anyhow!("Invalid sort key: {}", s)),
        }
    }
}

/// Catalog query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            category: None,
            search: None,
            sort: ProductSort::default(),
        }
    }
}

impl ProductQuery {
    /// Clamp page and limit into their valid ranges and drop blank filters.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_LIMIT);
        self.category = self.category.filter(|c| !c.trim().is_empty());
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            ((total + limit as u64 - 1) / limit as u64) as u32
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Number of products in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFacet {
    pub category: String,
    pub count: u64,
}

/// Cheapest and most expensive product in a result set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Aggregates used to render the filter UI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub categories: Vec<CategoryFacet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

/// One page of catalog results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
    pub facets: Facets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_query_normalized() {
        let q = ProductQuery {
            page: 0,
            limit: 1000,
            category: Some("  ".into()),
            search: Some("  linen ".into()),
            sort: ProductSort::PriceAsc,
        }
        .normalized();

        assert_eq!(q.page, 1);
        assert_eq!(q.limit, MAX_PAGE_LIMIT);
        assert_eq!(q.category, None);
        assert_eq!(q.search.as_deref(), Some("linen"));
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("price_desc".parse::<ProductSort>().unwrap(), ProductSort::PriceDesc);
        assert!("cheapest".parse::<ProductSort>().is_err());
        assert_eq!(ProductSort::Newest.to_string(), "newest");
    }
}
