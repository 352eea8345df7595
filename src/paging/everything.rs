use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{ApiClient, EverythingRequest};
use crate::domain::{non_blank, Cursor, Page, QueryParameters, FIRST_PAGE};
use crate::paging::categories::{category_query, fallback_query};
use crate::paging::{effective_page_size, linkable, LoadResult, PageSource, PageSizeLimits};

/// Pages through the `everything` endpoint for one search query.
#[derive(Clone)]
pub struct EverythingSource {
    api: Arc<ApiClient>,
    query: String,
    from: Option<String>,
    to: Option<String>,
    language: Option<String>,
    max_page_size: u32,
    fallback_query: Option<String>,
}

impl EverythingSource {
    pub fn new(api: Arc<ApiClient>, query: impl Into<String>, max_page_size: u32) -> Self {
        Self {
            api,
            query: query.into(),
            from: None,
            to: None,
            language: None,
            max_page_size,
            fallback_query: None,
        }
    }

    /// Build the source for a full parameter set. A blank user query falls
    /// back to the category keyword query so upstream always gets a `q`.
    pub fn for_parameters(api: Arc<ApiClient>, params: &QueryParameters, limits: PageSizeLimits) -> Self {
        let category = params.category.as_deref();
        let query = effective_query(params);

        Self::new(api, query, limits.everything)
            .date_window(params.date_from.clone(), params.date_to.clone())
            .language(params.language.clone())
            .with_fallback_query(fallback_query(category, params.edition))
    }

    pub fn date_window(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from = non_blank(from);
        self.to = non_blank(to);
        self
    }

    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = non_blank(language);
        self
    }

    pub fn with_fallback_query(mut self, query: impl Into<String>) -> Self {
        self.fallback_query = Some(query.into());
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// The `q` the everything endpoint will actually receive for `params`.
pub fn effective_query(params: &QueryParameters) -> String {
    let query = params.query.trim();
    if query.is_empty() {
        category_query(params.category.as_deref(), params.edition)
    } else {
        query.to_string()
    }
}

#[async_trait]
impl PageSource for EverythingSource {
    async fn load(&self, cursor: Option<Cursor>, page_size_hint: u32) -> LoadResult {
        let page = cursor.unwrap_or(FIRST_PAGE);
        let request = EverythingRequest::new(
            self.query.clone(),
            page,
            effective_page_size(page_size_hint, self.max_page_size),
        )
        .date_window(self.from.clone(), self.to.clone())
        .language(self.language.clone());

        match self.api.everything(&request).await {
            Ok(response) => {
                let raw = response.articles.len();
                let items = linkable(response.articles);
                if items.len() < raw {
                    debug!("Dropped {} articles without URL from page {}", raw - items.len(), page);
                }
                LoadResult::Page(Page::numbered(page, items))
            }
            Err(e) => LoadResult::Error(e),
        }
    }

    fn describe(&self) -> String {
        format!("everything q={:?}", self.query)
    }

    fn fallback(&self) -> Option<Arc<dyn PageSource>> {
        let query = self.fallback_query.as_ref()?;
        if query == &self.query {
            return None;
        }

        let mut fallback = self.clone();
        fallback.query = query.clone();
        fallback.fallback_query = None;
        Some(Arc::new(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Edition;
    use crate::paging::testing::{api_with_bodies, articles_body};
    use crate::paging::PagingEngine;
    use url::Url;

    #[test]
    fn test_effective_query_defaults_to_category_keywords() {
        let params = QueryParameters::new("  ").with_category(Some("science".into()));
        assert_eq!(effective_query(&params), "(sains OR science OR riset OR research)");

        let params = QueryParameters::new(" pemilu ");
        assert_eq!(effective_query(&params), "pemilu");
    }

    #[tokio::test]
    async fn test_load_first_page_filters_blank_urls() {
        let (api, backend) = api_with_bodies(vec![articles_body(&[
            Some("https://a"),
            None,
            Some(""),
            Some("https://b"),
        ])]);
        let source = EverythingSource::new(api, "indonesia", 20);

        let LoadResult::Page(page) = source.load(None, 50).await else {
            panic!("expected a page");
        };
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.prev_cursor, None);
        assert_eq!(page.next_cursor, Some(2));

        let url = backend.last_url().unwrap();
        assert!(url.contains("page=1"));
        assert!(url.contains("pageSize=20"));
        assert!(url.contains("sortBy=publishedAt"));
    }

    #[tokio::test]
    async fn test_page_empty_after_filtering_ends_stream() {
        let (api, _) = api_with_bodies(vec![articles_body(&[None, Some("  ")])]);
        let source = EverythingSource::new(api, "indonesia", 20);

        let LoadResult::Page(page) = source.load(Some(3), 10).await else {
            panic!("expected a page");
        };
        assert!(page.items.is_empty());
        assert_eq!(page.prev_cursor, Some(2));
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_parse_failure_becomes_load_error() {
        let (api, _) = api_with_bodies(vec!["not json".to_string()]);
        let source = EverythingSource::new(api, "indonesia", 20);
        assert!(source.load(None, 10).await.is_error());
    }

    #[tokio::test]
    async fn test_for_parameters_passes_filters_through() {
        let (api, backend) = api_with_bodies(vec![articles_body(&[Some("https://a")])]);
        let params = QueryParameters {
            query: "banjir".into(),
            date_from: Some("2024-01-01".into()),
            date_to: Some("2024-01-31".into()),
            language: Some("id".into()),
            ..Default::default()
        };
        let source = EverythingSource::for_parameters(api, &params, PageSizeLimits::default());
        source.load(None, 10).await;

        let url = backend.last_url().unwrap();
        assert!(url.contains("q=banjir"));
        assert!(url.contains("from=2024-01-01"));
        assert!(url.contains("to=2024-01-31"));
        assert!(url.contains("language=id"));
    }

    #[test]
    fn test_fallback_is_single_level() {
        let (api, _) = api_with_bodies(Vec::new());
        let params = QueryParameters::new("indonesia");
        let source = EverythingSource::for_parameters(api, &params, PageSizeLimits::default());

        let fallback = source.fallback().expect("fallback query available");
        assert_eq!(
            fallback.describe(),
            format!("everything q={:?}", fallback_query(None, Edition::International))
        );
        assert!(fallback.fallback().is_none());
    }

    #[test]
    fn test_no_fallback_when_identical() {
        let (api, _) = api_with_bodies(Vec::new());
        let query = fallback_query(None, Edition::International);
        let source = EverythingSource::new(api, query.clone(), 20).with_fallback_query(query);
        assert!(source.fallback().is_none());
    }

    #[tokio::test]
    async fn test_empty_search_falls_back_once_through_transport() {
        let empty = articles_body(&[]);
        let (api, backend) = api_with_bodies(vec![empty.clone(), empty]);
        let params = QueryParameters::new("indonesia");
        let source = EverythingSource::for_parameters(api, &params, PageSizeLimits::default());
        let engine = PagingEngine::new(Arc::new(source), 10);

        engine.refresh().await;
        let snapshot = engine.settled().await;

        assert_eq!(backend.calls(), 2);
        let last = Url::parse(&backend.last_url().unwrap()).unwrap();
        let q = last
            .query_pairs()
            .find(|(name, _)| name == "q")
            .map(|(_, value)| value.into_owned());
        assert_eq!(q, Some(fallback_query(None, Edition::International)));

        assert!(snapshot.is_empty());
        assert!(snapshot.refresh.is_loaded());
        assert!(snapshot.end_of_stream);
    }
}
