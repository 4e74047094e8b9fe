//! Headless CMS source
//!
//! One client for the three CMS flavours the site has been deployed against.
//! Each flavour wraps records differently; responses are flattened into the
//! plain field maps the models decode from:
//!
//! - Strapi: `{data: [{id, attributes: {..}}]}` with relations nested as `{data: ..}`
//! - Contentful: `{items: [{sys: {id}, fields: {..}}], includes: {Asset, Entry}}`
//! - Sanity: GROQ query results under `result`, ids in `_id`
//!
//! Contentful's delivery API is read-only, so every write against it is
//! reported as unsupported.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::{
    build_http_client, decode_record, decode_records, read_json, ContentSource, SourceError,
    SourceResult,
};
use crate::config::{CmsProvider, PrimarySourceConfig};
use crate::models::{
    Category, ContentBlock, ContentPatch, ContentQuery, CreateContentInput,
    CreateNavigationInput, Image, NavigationItem, NavigationPatch,
};

/// How deep linked Contentful entries are expanded
const MAX_LINK_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Content,
    Navigation,
    Category,
    Image,
}

impl RecordKind {
    fn label(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Navigation => "navigation",
            Self::Category => "category",
            Self::Image => "image",
        }
    }

    fn ordered(self) -> bool {
        matches!(self, Self::Navigation | Self::Category)
    }

    fn sanity_projection(self) -> &'static str {
        match self {
            Self::Content => {
                r#"{..., "id": _id, "image_url": coalesce(image_url, image.asset->url)}"#
            }
            Self::Navigation => r#"{..., "id": _id}"#,
            Self::Category => {
                r#"{..., "id": _id, "items": items[]->{..., "id": _id, "image_path": coalesce(image_path, image.asset->url)}}"#
            }
            Self::Image => r#"{..., "id": _id, "url": coalesce(url, image.asset->url)}"#,
        }
    }
}

type Filters = Vec<(&'static str, Value)>;

/// Headless CMS client
pub struct HeadlessCmsSource {
    client: reqwest::Client,
    name: String,
    config: PrimarySourceConfig,
    base_url: String,
}

impl HeadlessCmsSource {
    pub fn new(config: &PrimarySourceConfig, timeout: Duration) -> SourceResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            name: format!("cms:{}", config.provider),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    fn collection(&self, kind: RecordKind) -> &str {
        let names = &self.config.collections;
        match kind {
            RecordKind::Content => &names.content,
            RecordKind::Navigation => &names.navigation,
            RecordKind::Category => &names.categories,
            RecordKind::Image => &names.images,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch and flatten the records of `kind` matching every filter.
    async fn fetch(&self, kind: RecordKind, filters: Filters) -> SourceResult<Vec<Value>> {
        let records = match self.config.provider {
            CmsProvider::Strapi => self.fetch_strapi(kind, &filters).await?,
            CmsProvider::Contentful => self.fetch_contentful(kind, &filters).await?,
            CmsProvider::Sanity => self.fetch_sanity(kind, &filters).await?,
        };
        Ok(records
            .into_iter()
            .map(|record| self.normalize(kind, record))
            .collect())
    }

    async fn fetch_strapi(&self, kind: RecordKind, filters: &Filters) -> SourceResult<Vec<Value>> {
        let mut params: Vec<(String, String)> = filters
            .iter()
            .map(|(field, value)| (format!("filters[{}][$eq]", field), plain(value)))
            .collect();
        if kind == RecordKind::Category {
            params.push(("populate[items][populate]".to_string(), "*".to_string()));
        } else {
            params.push(("populate".to_string(), "*".to_string()));
        }
        if kind.ordered() {
            params.push(("sort".to_string(), "display_order:asc".to_string()));
        }

        let url = format!("{}/api/{}", self.base_url, self.collection(kind));
        let response = self
            .authorized(self.client.get(url))
            .query(&params)
            .send()
            .await?;
        into_records(flatten_strapi(read_json(response).await?))
    }

    async fn fetch_contentful(
        &self,
        kind: RecordKind,
        filters: &Filters,
    ) -> SourceResult<Vec<Value>> {
        let mut params: Vec<(String, String)> = vec![
            ("content_type".to_string(), self.collection(kind).to_string()),
            ("include".to_string(), "2".to_string()),
        ];
        params.extend(
            filters
                .iter()
                .map(|(field, value)| (format!("fields.{}", field), plain(value))),
        );
        if kind.ordered() {
            params.push(("order".to_string(), "fields.display_order".to_string()));
        }

        let url = format!("{}/entries", self.base_url);
        let response = self
            .authorized(self.client.get(url))
            .query(&params)
            .send()
            .await?;
        flatten_contentful(&read_json(response).await?)
    }

    async fn fetch_sanity(&self, kind: RecordKind, filters: &Filters) -> SourceResult<Vec<Value>> {
        let mut conditions = vec!["_type == $type".to_string()];
        conditions.extend(
            filters
                .iter()
                .map(|(field, _)| format!("{} == ${}", field, field)),
        );
        let mut groq = format!("*[{}]", conditions.join(" && "));
        if kind.ordered() {
            groq.push_str(" | order(display_order asc)");
        }
        groq.push_str(kind.sanity_projection());

        // GROQ parameters travel JSON-encoded
        let mut params: Vec<(String, String)> = vec![
            ("query".to_string(), groq),
            (
                "$type".to_string(),
                Value::String(self.collection(kind).to_string()).to_string(),
            ),
        ];
        params.extend(
            filters
                .iter()
                .map(|(field, value)| (format!("${}", field), value.to_string())),
        );

        let url = format!("{}/data/query/{}", self.base_url, self.config.dataset);
        let response = self
            .authorized(self.client.get(url))
            .query(&params)
            .send()
            .await?;
        let body = read_json(response).await?;
        into_records(body.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Give every flavour the same shape: an `id`, media promoted to the
    /// url fields the models expect, and items tied to their category.
    fn normalize(&self, kind: RecordKind, mut record: Value) -> Value {
        if let Some(map) = record.as_object_mut() {
            adopt_sanity_id(map);
            match kind {
                RecordKind::Content => self.promote_media(map, "image_url"),
                RecordKind::Image => self.promote_media(map, "url"),
                RecordKind::Navigation => {}
                RecordKind::Category => {
                    let parent = map.get("id").cloned();
                    if let Some(Value::Array(items)) = map.get_mut("items") {
                        for item in items.iter_mut().filter_map(Value::as_object_mut) {
                            adopt_sanity_id(item);
                            if let Some(parent) = &parent {
                                item.entry("category_id").or_insert_with(|| parent.clone());
                            }
                            self.promote_media(item, "image_path");
                        }
                    }
                }
            }
        }
        record
    }

    fn promote_media(&self, map: &mut Map<String, Value>, target: &str) {
        if map.get(target).is_some_and(|v| !v.is_null()) {
            return;
        }
        let url = map
            .get("image")
            .and_then(|image| image.get("url"))
            .and_then(Value::as_str)
            .map(|url| self.absolute_media_url(url));
        if let Some(url) = url {
            map.insert(target.to_string(), Value::String(url));
        }
    }

    fn absolute_media_url(&self, url: &str) -> String {
        if url.starts_with("//") {
            format!("https:{}", url)
        } else if url.starts_with('/') && self.config.provider == CmsProvider::Strapi {
            format!("{}{}", self.base_url, url)
        } else {
            url.to_string()
        }
    }

    async fn create_record<B: Serialize + Sync>(
        &self,
        kind: RecordKind,
        input: &B,
    ) -> SourceResult<Value> {
        let body = to_value(input)?;
        let record = match self.config.provider {
            CmsProvider::Contentful => return Err(SourceError::Unsupported),
            CmsProvider::Strapi => {
                let url = format!("{}/api/{}", self.base_url, self.collection(kind));
                let response = self
                    .authorized(self.client.post(url))
                    .json(&json!({ "data": body }))
                    .send()
                    .await?;
                flatten_strapi(read_json(response).await?)
            }
            CmsProvider::Sanity => {
                let mut document = body;
                if let Some(map) = document.as_object_mut() {
                    map.insert(
                        "_type".to_string(),
                        Value::String(self.collection(kind).to_string()),
                    );
                }
                self.sanity_mutate(json!({ "create": document }))
                    .await?
                    .into_iter()
                    .find_map(|result| result.get("document").cloned())
                    .ok_or_else(|| {
                        SourceError::Malformed("mutation returned no document".to_string())
                    })?
            }
        };
        Ok(self.normalize(kind, record))
    }

    async fn update_record<B: Serialize + Sync>(
        &self,
        kind: RecordKind,
        id: &str,
        patch: &B,
    ) -> SourceResult<Value> {
        let body = to_value(patch)?;
        let missing = || SourceError::NotFound(format!("{}/{}", self.collection(kind), id));
        let record = match self.config.provider {
            CmsProvider::Contentful => return Err(SourceError::Unsupported),
            CmsProvider::Strapi => {
                let url = format!("{}/api/{}/{}", self.base_url, self.collection(kind), id);
                let response = self
                    .authorized(self.client.put(url))
                    .json(&json!({ "data": body }))
                    .send()
                    .await?;
                let body = read_json(response).await.map_err(|e| not_found_on_404(e, missing))?;
                flatten_strapi(body)
            }
            CmsProvider::Sanity => self
                .sanity_mutate(sanity_patch(id, body))
                .await
                .map_err(|e| not_found_on_404(e, missing))?
                .into_iter()
                .find_map(|result| result.get("document").cloned())
                .ok_or_else(missing)?,
        };
        Ok(self.normalize(kind, record))
    }

    async fn delete_record(&self, kind: RecordKind, id: &str) -> SourceResult<()> {
        let missing = || SourceError::NotFound(format!("{}/{}", self.collection(kind), id));
        match self.config.provider {
            CmsProvider::Contentful => Err(SourceError::Unsupported),
            CmsProvider::Strapi => {
                let url = format!("{}/api/{}/{}", self.base_url, self.collection(kind), id);
                let response = self.authorized(self.client.delete(url)).send().await?;
                read_json(response)
                    .await
                    .map(|_| ())
                    .map_err(|e| not_found_on_404(e, missing))
            }
            CmsProvider::Sanity => {
                let results = self
                    .sanity_mutate(json!({ "delete": { "id": id } }))
                    .await
                    .map_err(|e| not_found_on_404(e, missing))?;
                if results.is_empty() {
                    Err(missing())
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn sanity_mutate(&self, mutation: Value) -> SourceResult<Vec<Value>> {
        let url = format!("{}/data/mutate/{}", self.base_url, self.config.dataset);
        let response = self
            .authorized(self.client.post(url))
            .query(&[("returnDocuments", "true")])
            .json(&json!({ "mutations": [mutation] }))
            .send()
            .await?;
        let body = read_json(response).await?;
        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

/// Sanity `set` cannot store `null`; cleared fields go to `unset` instead.
fn sanity_patch(id: &str, body: Value) -> Value {
    let Value::Object(fields) = body else {
        return json!({ "patch": { "id": id, "set": body } });
    };
    let (cleared, set): (Map<String, Value>, Map<String, Value>) =
        fields.into_iter().partition(|(_, v)| v.is_null());
    let mut patch = json!({ "id": id, "set": set });
    if !cleared.is_empty() {
        let keys: Vec<&String> = cleared.keys().collect();
        patch["unset"] = json!(keys);
    }
    json!({ "patch": patch })
}

#[async_trait]
impl ContentSource for HeadlessCmsSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_content(&self, query: &ContentQuery) -> SourceResult<Vec<ContentBlock>> {
        let mut filters: Filters = vec![("page", Value::String(query.page.clone()))];
        if let Some(section) = &query.section {
            filters.push(("section", Value::String(section.clone())));
        }
        let records = self.fetch(RecordKind::Content, filters).await?;
        Ok(decode_records(&self.name, RecordKind::Content.label(), records))
    }

    async fn create_content(&self, input: &CreateContentInput) -> SourceResult<ContentBlock> {
        decode_record(self.create_record(RecordKind::Content, input).await?)
    }

    async fn update_content(&self, id: &str, patch: &ContentPatch) -> SourceResult<ContentBlock> {
        decode_record(self.update_record(RecordKind::Content, id, patch).await?)
    }

    async fn list_navigation(&self) -> SourceResult<Vec<NavigationItem>> {
        let records = self.fetch(RecordKind::Navigation, Vec::new()).await?;
        Ok(decode_records(&self.name, RecordKind::Navigation.label(), records))
    }

    async fn create_navigation(
        &self,
        input: &CreateNavigationInput,
    ) -> SourceResult<NavigationItem> {
        decode_record(self.create_record(RecordKind::Navigation, input).await?)
    }

    async fn update_navigation(
        &self,
        id: &str,
        patch: &NavigationPatch,
    ) -> SourceResult<NavigationItem> {
        decode_record(self.update_record(RecordKind::Navigation, id, patch).await?)
    }

    async fn delete_navigation(&self, id: &str) -> SourceResult<()> {
        self.delete_record(RecordKind::Navigation, id).await
    }

    async fn list_categories(&self) -> SourceResult<Vec<Category>> {
        let records = self.fetch(RecordKind::Category, Vec::new()).await?;
        Ok(decode_records(&self.name, RecordKind::Category.label(), records))
    }

    async fn category_by_slug(&self, slug: &str) -> SourceResult<Option<Category>> {
        let records = self
            .fetch(RecordKind::Category, vec![("slug", Value::String(slug.to_string()))])
            .await?;
        Ok(
            decode_records::<Category>(&self.name, RecordKind::Category.label(), records)
                .into_iter()
                .next(),
        )
    }

    async fn list_images(&self, published_only: bool) -> SourceResult<Vec<Image>> {
        let filters = if published_only {
            vec![("is_published", Value::Bool(true))]
        } else {
            Vec::new()
        };
        let records = self.fetch(RecordKind::Image, filters).await?;
        Ok(decode_records(&self.name, RecordKind::Image.label(), records))
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_value<B: Serialize>(body: &B) -> SourceResult<Value> {
    serde_json::to_value(body).map_err(|e| SourceError::Malformed(e.to_string()))
}

fn not_found_on_404(error: SourceError, missing: impl FnOnce() -> SourceError) -> SourceError {
    match error {
        SourceError::Rejected { status: 404, .. } => missing(),
        other => other,
    }
}

fn adopt_sanity_id(map: &mut Map<String, Value>) {
    if !map.contains_key("id") {
        if let Some(id) = map.get("_id").cloned() {
            map.insert("id".to_string(), id);
        }
    }
}

fn into_records(value: Value) -> SourceResult<Vec<Value>> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        record @ Value::Object(_) => Ok(vec![record]),
        other => Err(SourceError::Malformed(format!(
            "expected records, got {}",
            other
        ))),
    }
}

/// Unwrap Strapi's `{data, meta}` envelopes and `{id, attributes}` records.
fn flatten_strapi(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(flatten_strapi).collect()),
        Value::Object(mut map) => {
            let envelope =
                map.contains_key("data") && map.keys().all(|k| k == "data" || k == "meta");
            if envelope {
                return map.remove("data").map(flatten_strapi).unwrap_or(Value::Null);
            }

            if let Some(Value::Object(attributes)) = map.remove("attributes") {
                let mut flat = Map::new();
                if let Some(id) = map.remove("id") {
                    flat.insert("id".to_string(), id);
                }
                for (key, value) in attributes {
                    flat.insert(key, flatten_strapi(value));
                }
                return Value::Object(flat);
            }

            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, flatten_strapi(value)))
                    .collect(),
            )
        }
        other => other,
    }
}

/// Linked assets and entries shipped alongside a Contentful response.
struct ContentfulIncludes<'a> {
    assets: HashMap<&'a str, &'a Value>,
    entries: HashMap<&'a str, &'a Value>,
}

impl<'a> ContentfulIncludes<'a> {
    fn from_body(body: &'a Value) -> Self {
        let index = |kind: &str| -> HashMap<&'a str, &'a Value> {
            body.pointer(&format!("/includes/{}", kind))
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|item| Some((sys_id(item)?, item)))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut entries = index("Entry");
        // Top-level items may link each other too
        if let Some(items) = body.get("items").and_then(Value::as_array) {
            for item in items {
                if let Some(id) = sys_id(item) {
                    entries.entry(id).or_insert(item);
                }
            }
        }

        Self {
            assets: index("Asset"),
            entries,
        }
    }

    fn entry(&self, entry: &Value, depth: usize) -> Value {
        let mut flat = Map::new();
        if let Some(id) = sys_id(entry) {
            flat.insert("id".to_string(), Value::String(id.to_string()));
        }
        if let Some(fields) = entry.get("fields").and_then(Value::as_object) {
            for (key, value) in fields {
                flat.insert(key.clone(), self.resolve(value, depth));
            }
        }
        Value::Object(flat)
    }

    fn resolve(&self, value: &Value, depth: usize) -> Value {
        match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.resolve(v, depth)).collect())
            }
            Value::Object(_) if is_link(value) => {
                let id = sys_id(value).unwrap_or_default();
                match value.pointer("/sys/linkType").and_then(Value::as_str) {
                    Some("Asset") => self.assets.get(id).map_or(Value::Null, |a| asset(a)),
                    Some("Entry") if depth < MAX_LINK_DEPTH => self
                        .entries
                        .get(id)
                        .map_or(Value::Null, |e| self.entry(e, depth + 1)),
                    _ => Value::Null,
                }
            }
            other => other.clone(),
        }
    }
}

fn sys_id(value: &Value) -> Option<&str> {
    value.pointer("/sys/id").and_then(Value::as_str)
}

fn is_link(value: &Value) -> bool {
    value.pointer("/sys/type").and_then(Value::as_str) == Some("Link")
}

fn asset(asset: &Value) -> Value {
    let url = asset
        .pointer("/fields/file/url")
        .and_then(Value::as_str)
        .map(|url| {
            if url.starts_with("//") {
                format!("https:{}", url)
            } else {
                url.to_string()
            }
        });
    json!({
        "id": sys_id(asset),
        "url": url,
        "title": asset.pointer("/fields/title"),
    })
}

fn flatten_contentful(body: &Value) -> SourceResult<Vec<Value>> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Malformed("response has no items".to_string()))?;
    let includes = ContentfulIncludes::from_body(body);
    Ok(items.iter().map(|item| includes.entry(item, 0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionNames;
    use crate::models::ContentValue;
    use mockito::{Matcher, Server};

    fn source(server: &Server, provider: CmsProvider) -> HeadlessCmsSource {
        HeadlessCmsSource::new(
            &PrimarySourceConfig {
                provider,
                base_url: server.url(),
                token: Some("cms-token".to_string()),
                dataset: "production".to_string(),
                collections: CollectionNames::default(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_flatten_strapi_envelopes() {
        let flat = flatten_strapi(json!({
            "data": [{
                "id": 1,
                "attributes": {
                    "title": "Evening",
                    "items": {"data": [{"id": 4, "attributes": {"title": "Gown"}}]},
                    "cover": {"data": null}
                }
            }],
            "meta": {"pagination": {"total": 1}}
        }));

        assert_eq!(
            flat,
            json!([{
                "id": 1,
                "title": "Evening",
                "items": [{"id": 4, "title": "Gown"}],
                "cover": null
            }])
        );
    }

    #[tokio::test]
    async fn test_strapi_list_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/site-contents")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filters[page][$eq]".into(), "home".into()),
                Matcher::UrlEncoded("filters[section][$eq]".into(), "hero".into()),
            ]))
            .match_header("authorization", "Bearer cms-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": [{
                        "id": 1,
                        "attributes": {
                            "page": "home",
                            "section": "hero",
                            "title": "Welcome",
                            "content": {"cta": "Shop"},
                            "image": {"data": {"id": 5, "attributes": {"url": "/uploads/hero.jpg"}}}
                        }
                    }],
                    "meta": {}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let cms = source(&server, CmsProvider::Strapi);
        let blocks = cms
            .list_content(&ContentQuery::section("home", "hero"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, "1");
        assert_eq!(blocks[0].title, "Welcome");
        assert_eq!(
            blocks[0].content.get("cta"),
            Some(&ContentValue::String("Shop".into()))
        );
        assert_eq!(
            blocks[0].image_url.as_deref(),
            Some(format!("{}/uploads/hero.jpg", server.url()).as_str())
        );
    }

    #[tokio::test]
    async fn test_strapi_update_missing_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/site-contents/99")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({"data": null, "error": {"status": 404, "message": "Not Found"}}).to_string())
            .create_async()
            .await;

        let err = source(&server, CmsProvider::Strapi)
            .update_content("99", &ContentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_contentful_resolves_linked_items_and_assets() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/entries")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("content_type".into(), "categories".into()),
                Matcher::UrlEncoded("order".into(), "fields.display_order".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "items": [{
                        "sys": {"id": "cat-1"},
                        "fields": {
                            "title": "Bridal",
                            "slug": "bridal",
                            "items": [{"sys": {"type": "Link", "linkType": "Entry", "id": "item-1"}}]
                        }
                    }],
                    "includes": {
                        "Entry": [{
                            "sys": {"id": "item-1"},
                            "fields": {
                                "title": "Veil",
                                "image": {"sys": {"type": "Link", "linkType": "Asset", "id": "asset-1"}}
                            }
                        }],
                        "Asset": [{
                            "sys": {"id": "asset-1"},
                            "fields": {"title": "Veil", "file": {"url": "//images.example.net/veil.jpg"}}
                        }]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let categories = source(&server, CmsProvider::Contentful)
            .list_categories()
            .await
            .unwrap();

        assert_eq!(categories.len(), 1);
        let item = &categories[0].items[0];
        assert_eq!(item.category_id, "cat-1");
        assert_eq!(item.image_path, "https://images.example.net/veil.jpg");
    }

    #[tokio::test]
    async fn test_contentful_writes_unsupported() {
        let server = Server::new_async().await;
        let err = source(&server, CmsProvider::Contentful)
            .delete_navigation("1")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unsupported));
    }

    #[tokio::test]
    async fn test_sanity_query_parameters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/data/query/production")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("$type".into(), "\"site-contents\"".into()),
                Matcher::UrlEncoded("$page".into(), "\"about\"".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "result": [{
                        "_id": "doc-1",
                        "id": "doc-1",
                        "page": "about",
                        "section": "story",
                        "title": "Our story"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let blocks = source(&server, CmsProvider::Sanity)
            .list_content(&ContentQuery::page("about"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(blocks[0].id, "doc-1");
    }

    #[tokio::test]
    async fn test_sanity_patch_returns_document() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/data/mutate/production")
            .match_query(Matcher::UrlEncoded("returnDocuments".into(), "true".into()))
            .match_body(Matcher::PartialJson(json!({
                "mutations": [{"patch": {"id": "nav-1", "set": {"title": "Atelier"}}}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "transactionId": "tx",
                    "results": [{
                        "id": "nav-1",
                        "operation": "update",
                        "document": {"_id": "nav-1", "title": "Atelier", "path": "/atelier"}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let patch = NavigationPatch {
            title: Some("Atelier".into()),
            ..Default::default()
        };
        let item = source(&server, CmsProvider::Sanity)
            .update_navigation("nav-1", &patch)
            .await
            .unwrap();
        assert_eq!(item.id, "nav-1");
        assert_eq!(item.title, "Atelier");
    }

    #[test]
    fn test_sanity_patch_unsets_cleared_fields() {
        let patch = ContentPatch {
            title: Some("Atelier".into()),
            subtitle: Some(None),
            ..Default::default()
        };
        let mutation = sanity_patch("c-1", serde_json::to_value(&patch).unwrap());
        assert_eq!(
            mutation,
            json!({"patch": {"id": "c-1", "set": {"title": "Atelier"}, "unset": ["subtitle"]}})
        );

        let plain = sanity_patch("c-1", json!({"title": "Atelier"}));
        assert!(plain["patch"].get("unset").is_none());
    }
}
