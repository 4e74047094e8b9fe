//! Product catalog API endpoint

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ProductQuery, ProductSort};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_products))
}

/// Raw query string; parsed by hand so bad values get a readable 400
#[derive(Debug, Default, Deserialize)]
struct ProductParams {
    page: Option<String>,
    limit: Option<String>,
    category: Option<String>,
    search: Option<String>,
    sort: Option<String>,
}

fn parse_number(field: &str, value: Option<&str>, default: u32) -> Result<u32, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ApiError::validation_error(format!("{} must be a positive integer", field))),
    }
}

impl TryFrom<ProductParams> for ProductQuery {
    type Error = ApiError;

    fn try_from(params: ProductParams) -> Result<Self, Self::Error> {
        let defaults = ProductQuery::default();
        let sort = match params.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => ProductSort::default(),
            Some(s) => s
                .parse()
                .map_err(|e: anyhow::Error| ApiError::validation_error(e.to_string()))?,
        };

        Ok(ProductQuery {
            page: parse_number("page", params.page.as_deref(), defaults.page)?,
            limit: parse_number("limit", params.limit.as_deref(), defaults.limit)?,
            category: params.category,
            search: params.search,
            sort,
        }
        .normalized())
    }
}

/// GET /api/v1/products?page=1&limit=12&category=dresses&search=linen&sort=price_asc
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ProductQuery::try_from(params)?;
    let page = state.catalog.products(&query).await?;
    Ok(Json(page))
}
