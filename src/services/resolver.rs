//! Content resolver
//!
//! Walks an ordered chain of content sources:
//! - Reads: the first source with a non-empty answer wins. Errors and empty
//!   answers fall through; later sources are not contacted once one answers.
//!   When nothing answers the caller gets an empty collection, never an error.
//! - Writes: the first source that accepts the mutation wins. When every
//!   source refuses, the caller gets every source's error.
//!
//! Sources are queried one at a time, in order.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ContentConfig;
use crate::models::{
    Category, CategoryItem, CategoryItemPatch, CategoryPatch, ContentBlock, ContentPatch,
    ContentQuery, CreateCategoryInput, CreateCategoryItemInput, CreateContentInput,
    CreateImageInput, CreateNavigationInput, Image, ImagePatch, NavigationItem, NavigationPatch,
};
use crate::sources::{
    ContentSource, HeadlessCmsSource, LocalSource, LocalStore, SourceError, SourceResult,
    TableStoreSource,
};

/// Answers that can be "empty" for fall-through purposes
pub trait Resolved {
    fn is_empty_answer(&self) -> bool;
}

impl<T> Resolved for Vec<T> {
    fn is_empty_answer(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Resolved for Option<T> {
    fn is_empty_answer(&self) -> bool {
        self.is_none()
    }
}

/// Error returned by resolver mutations
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No content sources are configured")]
    NoSources,

    #[error("{operation} failed on every source: {}", summarize(.failures))]
    AllSourcesFailed {
        operation: &'static str,
        failures: Vec<(String, SourceError)>,
    },
}

impl ResolveError {
    /// True when the record was missing everywhere it could have been.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoSources => false,
            Self::AllSourcesFailed { failures, .. } => {
                failures
                    .iter()
                    .any(|(_, e)| matches!(e, SourceError::NotFound(_)))
                    && failures.iter().all(|(_, e)| {
                        matches!(e, SourceError::NotFound(_) | SourceError::Unsupported)
                    })
            }
        }
    }
}

fn summarize(failures: &[(String, SourceError)]) -> String {
    failures
        .iter()
        .map(|(source, error)| format!("{}: {}", source, error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decide whether local persistence replaces the secondary source.
///
/// An explicit config value wins; otherwise the persisted toggle decides.
pub async fn local_mode(configured: Option<bool>, store: &LocalStore) -> bool {
    match configured {
        Some(enabled) => enabled,
        None => store.use_local_storage().await,
    }
}

/// Ordered multi-source content resolver
pub struct ContentResolver {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl ContentResolver {
    pub fn new(sources: Vec<Arc<dyn ContentSource>>) -> Self {
        Self { sources }
    }

    /// Build the chain `[primary?, secondary]`, or `[primary?, local]` in local mode.
    ///
    /// Without a configured secondary the local store takes its place.
    pub fn from_config(
        config: &ContentConfig,
        local: LocalStore,
        use_local: bool,
    ) -> SourceResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let mut sources: Vec<Arc<dyn ContentSource>> = Vec::new();

        if let Some(primary) = &config.primary {
            sources.push(Arc::new(HeadlessCmsSource::new(primary, timeout)?));
        }

        match (&config.secondary, use_local) {
            (Some(secondary), false) => {
                sources.push(Arc::new(TableStoreSource::new(secondary, timeout)?));
            }
            (None, false) => {
                tracing::warn!("No secondary content source configured, using local storage");
                sources.push(Arc::new(LocalSource::new(local)));
            }
            (_, true) => sources.push(Arc::new(LocalSource::new(local))),
        }

        Ok(Self::new(sources))
    }

    /// Source names in query order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    async fn read_chain<'a, T, F>(&'a self, operation: &'static str, fetch: F) -> T
    where
        T: Resolved + Default,
        F: Fn(&'a dyn ContentSource) -> BoxFuture<'a, SourceResult<T>>,
    {
        for source in &self.sources {
            match fetch(source.as_ref()).await {
                Ok(answer) if !answer.is_empty_answer() => {
                    tracing::debug!("{} resolved from {}", operation, source.name());
                    return answer;
                }
                Ok(_) => tracing::debug!("{}: {} had nothing", operation, source.name()),
                Err(SourceError::Unsupported) => {
                    tracing::debug!("{}: {} does not support it", operation, source.name())
                }
                Err(e) => tracing::warn!("{}: {} failed: {}", operation, source.name(), e),
            }
        }
        tracing::debug!("{}: no source had an answer", operation);
        T::default()
    }

    async fn write_chain<'a, T, F>(
        &'a self,
        operation: &'static str,
        attempt: F,
    ) -> Result<T, ResolveError>
    where
        F: Fn(&'a dyn ContentSource) -> BoxFuture<'a, SourceResult<T>>,
    {
        if self.sources.is_empty() {
            return Err(ResolveError::NoSources);
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match attempt(source.as_ref()).await {
                Ok(value) => {
                    tracing::info!("{} applied via {}", operation, source.name());
                    return Ok(value);
                }
                Err(e) => {
                    if matches!(e, SourceError::Unsupported) {
                        tracing::debug!("{}: {} does not support it", operation, source.name());
                    } else {
                        tracing::warn!("{}: {} failed: {}", operation, source.name(), e);
                    }
                    failures.push((source.name().to_string(), e));
                }
            }
        }

        Err(ResolveError::AllSourcesFailed {
            operation,
            failures,
        })
    }

    pub async fn resolve_content(&self, query: &ContentQuery) -> Vec<ContentBlock> {
        self.read_chain("content", |s| s.list_content(query)).await
    }

    pub async fn resolve_navigation(&self) -> Vec<NavigationItem> {
        self.read_chain("navigation", |s| s.list_navigation()).await
    }

    pub async fn resolve_categories(&self) -> Vec<Category> {
        self.read_chain("categories", |s| s.list_categories()).await
    }

    pub async fn resolve_category(&self, slug: &str) -> Option<Category> {
        self.read_chain("category", |s| s.category_by_slug(slug)).await
    }

    pub async fn resolve_images(&self, published_only: bool) -> Vec<Image> {
        self.read_chain("images", |s| s.list_images(published_only))
            .await
    }

    pub async fn create_content(
        &self,
        input: &CreateContentInput,
    ) -> Result<ContentBlock, ResolveError> {
        self.write_chain("create content", |s| s.create_content(input))
            .await
    }

    pub async fn update_content(
        &self,
        id: &str,
        patch: &ContentPatch,
    ) -> Result<ContentBlock, ResolveError> {
        self.write_chain("update content", |s| s.update_content(id, patch))
            .await
    }

    pub async fn create_navigation(
        &self,
        input: &CreateNavigationInput,
    ) -> Result<NavigationItem, ResolveError> {
        self.write_chain("create navigation item", |s| s.create_navigation(input))
            .await
    }

    pub async fn update_navigation(
        &self,
        id: &str,
        patch: &NavigationPatch,
    ) -> Result<NavigationItem, ResolveError> {
        self.write_chain("update navigation item", |s| {
            s.update_navigation(id, patch)
        })
        .await
    }

    pub async fn delete_navigation(&self, id: &str) -> Result<(), ResolveError> {
        self.write_chain("delete navigation item", |s| s.delete_navigation(id))
            .await
    }

    pub async fn create_category(
        &self,
        input: &CreateCategoryInput,
    ) -> Result<Category, ResolveError> {
        self.write_chain("create category", |s| s.create_category(input))
            .await
    }

    pub async fn update_category(
        &self,
        id: &str,
        patch: &CategoryPatch,
    ) -> Result<Category, ResolveError> {
        self.write_chain("update category", |s| s.update_category(id, patch))
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), ResolveError> {
        self.write_chain("delete category", |s| s.delete_category(id))
            .await
    }

    pub async fn create_category_item(
        &self,
        input: &CreateCategoryItemInput,
    ) -> Result<CategoryItem, ResolveError> {
        self.write_chain("create category item", |s| s.create_category_item(input))
            .await
    }

    pub async fn update_category_item(
        &self,
        id: &str,
        patch: &CategoryItemPatch,
    ) -> Result<CategoryItem, ResolveError> {
        self.write_chain("update category item", |s| {
            s.update_category_item(id, patch)
        })
        .await
    }

    pub async fn delete_category_item(&self, id: &str) -> Result<(), ResolveError> {
        self.write_chain("delete category item", |s| s.delete_category_item(id))
            .await
    }

    pub async fn create_image(&self, input: &CreateImageInput) -> Result<Image, ResolveError> {
        self.write_chain("create image", |s| s.create_image(input))
            .await
    }

    pub async fn update_image(
        &self,
        id: &str,
        patch: &ImagePatch,
    ) -> Result<Image, ResolveError> {
        self.write_chain("update image", |s| s.update_image(id, patch))
            .await
    }

    pub async fn delete_image(&self, id: &str) -> Result<(), ResolveError> {
        self.write_chain("delete image", |s| s.delete_image(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentFields;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What a scripted source does when asked
    #[derive(Debug, Clone)]
    enum Answer {
        Fail,
        Empty,
        Blocks(Vec<&'static str>),
    }

    struct ScriptedSource {
        name: String,
        reads: Answer,
        write: Result<(), fn() -> SourceError>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(name: &str, reads: Answer) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reads,
                write: Ok(()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing_writes(name: &str, error: fn() -> SourceError) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reads: Answer::Fail,
                write: Err(error),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn block(id: &str, title: &str) -> ContentBlock {
        ContentBlock {
            id: id.to_string(),
            page: "home".to_string(),
            section: "hero".to_string(),
            title: title.to_string(),
            subtitle: None,
            description: None,
            image_url: None,
            content: ContentFields::new(),
        }
    }

    #[async_trait]
    impl ContentSource for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn list_content(&self, _query: &ContentQuery) -> SourceResult<Vec<ContentBlock>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reads {
                Answer::Fail => Err(SourceError::Unavailable("connection refused".into())),
                Answer::Empty => Ok(Vec::new()),
                Answer::Blocks(titles) => Ok(titles
                    .iter()
                    .enumerate()
                    .map(|(i, title)| block(&format!("{}-{}", self.name, i), title))
                    .collect()),
            }
        }

        async fn update_content(
            &self,
            id: &str,
            patch: &ContentPatch,
        ) -> SourceResult<ContentBlock> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.write {
                Ok(()) => {
                    let mut updated = block(id, "");
                    patch.apply_to(&mut updated);
                    Ok(updated)
                }
                Err(error) => Err(error()),
            }
        }
    }

    fn resolver(sources: &[Arc<ScriptedSource>]) -> ContentResolver {
        ContentResolver::new(
            sources
                .iter()
                .map(|s| s.clone() as Arc<dyn ContentSource>)
                .collect(),
        )
    }

    fn unavailable() -> SourceError {
        SourceError::Unavailable("timeout".into())
    }

    fn not_found() -> SourceError {
        SourceError::NotFound("content 7".into())
    }

    #[tokio::test]
    async fn test_primary_answer_short_circuits() {
        let primary = ScriptedSource::new("primary", Answer::Blocks(vec!["From CMS"]));
        let secondary = ScriptedSource::new("secondary", Answer::Blocks(vec!["From table"]));

        let blocks = resolver(&[primary.clone(), secondary.clone()])
            .resolve_content(&ContentQuery::section("home", "hero"))
            .await;

        assert_eq!(blocks[0].title, "From CMS");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_primary_falls_through() {
        let primary = ScriptedSource::new("primary", Answer::Fail);
        let secondary = ScriptedSource::new("secondary", Answer::Blocks(vec!["Welcome"]));

        let blocks = resolver(&[primary.clone(), secondary.clone()])
            .resolve_content(&ContentQuery::section("home", "hero"))
            .await;

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title, "Welcome");
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_primary_falls_through() {
        let primary = ScriptedSource::new("primary", Answer::Empty);
        let secondary = ScriptedSource::new("secondary", Answer::Blocks(vec!["Welcome"]));

        let blocks = resolver(&[primary, secondary])
            .resolve_content(&ContentQuery::page("home"))
            .await;
        assert_eq!(blocks[0].title, "Welcome");
    }

    #[tokio::test]
    async fn test_nothing_answers_is_empty() {
        let blocks = resolver(&[
            ScriptedSource::new("primary", Answer::Fail),
            ScriptedSource::new("secondary", Answer::Empty),
        ])
        .resolve_content(&ContentQuery::page("home"))
        .await;
        assert!(blocks.is_empty());

        assert!(resolver(&[]).resolve_content(&ContentQuery::page("home")).await.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_reads_fall_through() {
        let primary = ScriptedSource::new("primary", Answer::Blocks(vec!["x"]));
        let categories = resolver(&[primary]).resolve_categories().await;
        assert!(categories.is_empty());
    }

    #[tokio::test]
    async fn test_update_falls_back_to_secondary() {
        let primary = ScriptedSource::failing_writes("primary", unavailable);
        let secondary = ScriptedSource::new("secondary", Answer::Empty);

        let patch = ContentPatch {
            title: Some("X".into()),
            ..Default::default()
        };
        let updated = resolver(&[primary.clone(), secondary.clone()])
            .update_content("7", &patch)
            .await
            .unwrap();

        assert_eq!(updated.id, "7");
        assert_eq!(updated.title, "X");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_update_stops_at_first_success() {
        let primary = ScriptedSource::new("primary", Answer::Empty);
        let secondary = ScriptedSource::new("secondary", Answer::Empty);

        resolver(&[primary.clone(), secondary.clone()])
            .update_content("7", &ContentPatch::default())
            .await
            .unwrap();
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_fails_everywhere() {
        let err = resolver(&[
            ScriptedSource::failing_writes("primary", unavailable),
            ScriptedSource::failing_writes("secondary", unavailable),
        ])
        .update_content("7", &ContentPatch::default())
        .await
        .unwrap_err();

        match &err {
            ResolveError::AllSourcesFailed {
                operation,
                failures,
            } => {
                assert_eq!(*operation, "update content");
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].0, "primary");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("primary: source unavailable: timeout"));
    }

    #[tokio::test]
    async fn test_missing_everywhere_is_not_found() {
        let err = resolver(&[
            ScriptedSource::failing_writes("primary", || SourceError::Unsupported),
            ScriptedSource::failing_writes("secondary", not_found),
        ])
        .update_content("7", &ContentPatch::default())
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_without_sources() {
        let err = resolver(&[])
            .delete_navigation("1")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoSources));
    }

    fn answer_strategy() -> impl Strategy<Value = Answer> {
        prop_oneof![
            Just(Answer::Fail),
            Just(Answer::Empty),
            prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 1..4)
                .prop_map(Answer::Blocks),
        ]
    }

    proptest! {
        #[test]
        fn property_first_non_empty_answer_wins(answers in prop::collection::vec(answer_strategy(), 0..5)) {
            let sources: Vec<Arc<ScriptedSource>> = answers
                .iter()
                .enumerate()
                .map(|(i, answer)| ScriptedSource::new(&format!("s{}", i), answer.clone()))
                .collect();

            let blocks = tokio_test::block_on(
                resolver(&sources).resolve_content(&ContentQuery::page("home")),
            );

            let winner = answers
                .iter()
                .position(|a| matches!(a, Answer::Blocks(_)));
            match winner {
                Some(index) => {
                    let Answer::Blocks(titles) = &answers[index] else { unreachable!() };
                    let got: Vec<&str> = blocks.iter().map(|b| b.title.as_str()).collect();
                    prop_assert_eq!(&got, titles);
                    for (i, source) in sources.iter().enumerate() {
                        prop_assert_eq!(source.calls(), usize::from(i <= index));
                    }
                }
                None => {
                    prop_assert!(blocks.is_empty());
                    for source in &sources {
                        prop_assert_eq!(source.calls(), 1);
                    }
                }
            }
        }
    }
}
