//! Table store source
//!
//! Speaks the PostgREST dialect used by hosted table stores: one endpoint per
//! table under `<base>/rest/v1/`, `col=eq.value` filters, `order=col.asc`,
//! and `Prefer: return=representation` so writes echo the stored row.
//! This is also the admin dashboard's store of record.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{
    build_http_client, decode_record, decode_records, read_json, ContentSource, SourceError,
    SourceResult,
};
use crate::config::SecondarySourceConfig;
use crate::models::{
    Category, CategoryItem, CategoryItemPatch, CategoryPatch, ContentBlock, ContentPatch,
    ContentQuery, CreateCategoryInput, CreateCategoryItemInput, CreateContentInput,
    CreateImageInput, CreateNavigationInput, Image, ImagePatch, NavigationItem, NavigationPatch,
};

const TABLE_CONTENT: &str = "site_content";
const TABLE_NAVIGATION: &str = "navigation_items";
const TABLE_CATEGORIES: &str = "categories";
const TABLE_CATEGORY_ITEMS: &str = "category_items";
const TABLE_IMAGES: &str = "images";

/// Categories come back with their items embedded under `items`.
const CATEGORY_SELECT: &str = "*,items:category_items(*)";

/// Table-oriented data store client
pub struct TableStoreSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TableStoreSource {
    pub fn new(config: &SecondarySourceConfig, timeout: Duration) -> SourceResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        builder
    }

    /// `GET table?select=..&<filters>&order=..`
    async fn select(
        &self,
        table: &str,
        select: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
    ) -> SourceResult<Vec<Value>> {
        let mut params: Vec<(&str, String)> = vec![("select", select.to_string())];
        params.extend(filters.iter().cloned());
        if let Some(order) = order {
            params.push(("order", order.to_string()));
        }

        let response = self
            .request(Method::GET, table)
            .query(&params)
            .send()
            .await?;
        rows(read_json(response).await?)
    }

    async fn insert<B: Serialize + Sync>(&self, table: &str, body: &B) -> SourceResult<Value> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        first_row(read_json(response).await?, table, "insert")
    }

    async fn patch<B: Serialize + Sync>(&self, table: &str, id: &str, body: &B) -> SourceResult<Value> {
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        first_row(read_json(response).await?, table, id)
    }

    async fn remove(&self, table: &str, id: &str) -> SourceResult<()> {
        let response = self
            .request(Method::DELETE, table)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        first_row(read_json(response).await?, table, id).map(|_| ())
    }

    /// Re-read one category so the response carries its embedded items.
    async fn fetch_category(&self, id: &str) -> SourceResult<Category> {
        let rows = self
            .select(TABLE_CATEGORIES, CATEGORY_SELECT, &[("id", eq(id))], None)
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(format!("{}/{}", TABLE_CATEGORIES, id)))?;
        decode_record(row)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn rows(body: Value) -> SourceResult<Vec<Value>> {
    match body {
        Value::Array(rows) => Ok(rows),
        other => Err(SourceError::Malformed(format!(
            "expected an array of rows, got {}",
            other
        ))),
    }
}

/// Writes answer with the affected rows; none means the id matched nothing.
fn first_row(body: Value, table: &str, what: &str) -> SourceResult<Value> {
    rows(body)?
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::NotFound(format!("{}/{}", table, what)))
}

#[async_trait]
impl ContentSource for TableStoreSource {
    fn name(&self) -> &str {
        "table-store"
    }

    async fn list_content(&self, query: &ContentQuery) -> SourceResult<Vec<ContentBlock>> {
        let mut filters = vec![("page", eq(&query.page))];
        if let Some(section) = &query.section {
            filters.push(("section", eq(section)));
        }
        let rows = self
            .select(TABLE_CONTENT, "*", &filters, Some("id.asc"))
            .await?;
        Ok(decode_records(self.name(), "content", rows))
    }

    async fn create_content(&self, input: &CreateContentInput) -> SourceResult<ContentBlock> {
        decode_record(self.insert(TABLE_CONTENT, input).await?)
    }

    async fn update_content(&self, id: &str, patch: &ContentPatch) -> SourceResult<ContentBlock> {
        decode_record(self.patch(TABLE_CONTENT, id, patch).await?)
    }

    async fn list_navigation(&self) -> SourceResult<Vec<NavigationItem>> {
        let rows = self
            .select(TABLE_NAVIGATION, "*", &[], Some("display_order.asc"))
            .await?;
        Ok(decode_records(self.name(), "navigation", rows))
    }

    async fn create_navigation(
        &self,
        input: &CreateNavigationInput,
    ) -> SourceResult<NavigationItem> {
        decode_record(self.insert(TABLE_NAVIGATION, input).await?)
    }

    async fn update_navigation(
        &self,
        id: &str,
        patch: &NavigationPatch,
    ) -> SourceResult<NavigationItem> {
        decode_record(self.patch(TABLE_NAVIGATION, id, patch).await?)
    }

    async fn delete_navigation(&self, id: &str) -> SourceResult<()> {
        self.remove(TABLE_NAVIGATION, id).await
    }

    async fn list_categories(&self) -> SourceResult<Vec<Category>> {
        let rows = self
            .select(TABLE_CATEGORIES, CATEGORY_SELECT, &[], Some("display_order.asc"))
            .await?;
        Ok(decode_records(self.name(), "category", rows))
    }

    async fn category_by_slug(&self, slug: &str) -> SourceResult<Option<Category>> {
        let rows = self
            .select(TABLE_CATEGORIES, CATEGORY_SELECT, &[("slug", eq(slug))], None)
            .await?;
        Ok(decode_records(self.name(), "category", rows).into_iter().next())
    }

    async fn create_category(&self, input: &CreateCategoryInput) -> SourceResult<Category> {
        let row = self.insert(TABLE_CATEGORIES, input).await?;
        let id = row_id(&row)?;
        self.fetch_category(&id).await
    }

    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> SourceResult<Category> {
        self.patch(TABLE_CATEGORIES, id, patch).await?;
        self.fetch_category(id).await
    }

    async fn delete_category(&self, id: &str) -> SourceResult<()> {
        self.remove(TABLE_CATEGORIES, id).await
    }

    async fn create_category_item(
        &self,
        input: &CreateCategoryItemInput,
    ) -> SourceResult<CategoryItem> {
        decode_record(self.insert(TABLE_CATEGORY_ITEMS, input).await?)
    }

    async fn update_category_item(
        &self,
        id: &str,
        patch: &CategoryItemPatch,
    ) -> SourceResult<CategoryItem> {
        decode_record(self.patch(TABLE_CATEGORY_ITEMS, id, patch).await?)
    }

    async fn delete_category_item(&self, id: &str) -> SourceResult<()> {
        self.remove(TABLE_CATEGORY_ITEMS, id).await
    }

    async fn list_images(&self, published_only: bool) -> SourceResult<Vec<Image>> {
        let filters = if published_only {
            vec![("is_published", "eq.true".to_string())]
        } else {
            Vec::new()
        };
        let rows = self
            .select(TABLE_IMAGES, "*", &filters, Some("id.desc"))
            .await?;
        Ok(decode_records(self.name(), "image", rows))
    }

    async fn create_image(&self, input: &CreateImageInput) -> SourceResult<Image> {
        decode_record(self.insert(TABLE_IMAGES, input).await?)
    }

    async fn update_image(&self, id: &str, patch: &ImagePatch) -> SourceResult<Image> {
        decode_record(self.patch(TABLE_IMAGES, id, patch).await?)
    }

    async fn delete_image(&self, id: &str) -> SourceResult<()> {
        self.remove(TABLE_IMAGES, id).await
    }
}

fn row_id(row: &Value) -> SourceResult<String> {
    match row.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(SourceError::Malformed("inserted row has no id".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentFields;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn source(server: &Server) -> TableStoreSource {
        TableStoreSource::new(
            &SecondarySourceConfig {
                base_url: server.url(),
                api_key: Some("anon-key".to_string()),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_content_sends_filters_and_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/site_content")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "eq.home".into()),
                Matcher::UrlEncoded("section".into(), "eq.hero".into()),
                Matcher::UrlEncoded("select".into(), "*".into()),
            ]))
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer anon-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": 1, "page": "home", "section": "hero",
                    "title": "Welcome", "content": {"cta": "Shop"}
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let blocks = source(&server)
            .list_content(&ContentQuery::section("home", "hero"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title, "Welcome");
        assert_eq!(blocks[0].id, "1");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/site_content")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.abc".into()))
            .match_header("prefer", "return=representation")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let err = source(&server)
            .update_content("abc", &ContentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejected_carries_store_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/rest/v1/site_content")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({"message": "Invalid API key"}).to_string())
            .create_async()
            .await;

        let input = CreateContentInput {
            page: "home".into(),
            section: "hero".into(),
            title: "Welcome".into(),
            subtitle: None,
            description: None,
            image_url: None,
            content: ContentFields::new(),
        };
        let err = source(&server).create_content(&input).await.unwrap_err();
        match err {
            SourceError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_category_by_slug_embeds_items() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/v1/categories")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("slug".into(), "eq.evening".into()),
                Matcher::UrlEncoded("select".into(), CATEGORY_SELECT.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": 3, "title": "Evening", "slug": "evening",
                    "items": [{"id": 9, "category_id": 3, "title": "Gown", "image_path": "g.jpg"}]
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let category = source(&server)
            .category_by_slug("evening")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.items.len(), 1);
        assert_eq!(category.items[0].title, "Gown");
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let store = TableStoreSource::new(
            &SecondarySourceConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                api_key: None,
            },
            Duration::from_secs(2),
        )
        .unwrap();

        let err = store.list_navigation().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
