use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::ApiClient;
use crate::domain::{non_blank, Cursor, Edition, Page, FIRST_PAGE};
use crate::paging::categories::category_query;
use crate::paging::{effective_page_size, linkable, EverythingSource, LoadResult, PageSource, PageSizeLimits};

/// Pages through `top-headlines` for one country, optionally filtered by a
/// native category. When that combination yields nothing, the keyword query
/// for the category is searched on `everything` instead.
pub struct HeadlinesSource {
    api: Arc<ApiClient>,
    country: String,
    category: Option<String>,
    edition: Edition,
    limits: PageSizeLimits,
}

impl HeadlinesSource {
    pub fn new(api: Arc<ApiClient>, country: impl Into<String>, category: Option<String>) -> Self {
        Self {
            api,
            country: country.into(),
            category: non_blank(category),
            edition: Edition::default(),
            limits: PageSizeLimits::default(),
        }
    }

    pub fn edition(mut self, edition: Edition) -> Self {
        self.edition = edition;
        self
    }

    pub fn limits(mut self, limits: PageSizeLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[async_trait]
impl PageSource for HeadlinesSource {
    async fn load(&self, cursor: Option<Cursor>, page_size_hint: u32) -> LoadResult {
        let page = cursor.unwrap_or(FIRST_PAGE);
        let page_size = effective_page_size(page_size_hint, self.limits.headlines);

        match self
            .api
            .top_headlines(&self.country, self.category.as_deref(), page, page_size)
            .await
        {
            Ok(response) => {
                let raw = response.articles.len();
                let items = linkable(response.articles);
                if items.len() < raw {
                    debug!("Dropped {} headlines without URL from page {}", raw - items.len(), page);
                }
                LoadResult::Page(Page::numbered(page, items))
            }
            Err(e) => LoadResult::Error(e),
        }
    }

    fn describe(&self) -> String {
        match &self.category {
            Some(category) => format!("headlines country={} category={}", self.country, category),
            None => format!("headlines country={}", self.country),
        }
    }

    fn fallback(&self) -> Option<Arc<dyn PageSource>> {
        let query = category_query(self.category.as_deref(), self.edition);
        Some(Arc::new(EverythingSource::new(
            self.api.clone(),
            query,
            self.limits.everything,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::testing::{api_with_bodies, articles_body};

    #[tokio::test]
    async fn test_ten_headlines_with_three_blank_urls_yield_seven() {
        let urls: Vec<Option<String>> = (0..10)
            .map(|i| {
                if i % 3 == 1 {
                    None
                } else {
                    Some(format!("https://news.example/{i}"))
                }
            })
            .collect();
        let refs: Vec<Option<&str>> = urls.iter().map(|u| u.as_deref()).collect();
        let (api, backend) = api_with_bodies(vec![articles_body(&refs)]);

        let source = HeadlinesSource::new(api, "id", None);
        let LoadResult::Page(page) = source.load(None, 10).await else {
            panic!("expected a page");
        };

        assert_eq!(page.items.len(), 7);
        assert!(page.items.iter().all(|a| a.has_link()));
        let url = backend.last_url().unwrap();
        assert!(url.contains("country=id"));
        assert!(!url.contains("category="));
        assert!(url.contains("pageSize=10"));
    }

    #[tokio::test]
    async fn test_page_size_capped_at_headlines_limit() {
        let (api, backend) = api_with_bodies(vec![articles_body(&[Some("https://a")])]);
        let source = HeadlinesSource::new(api, "id", Some("business".into()));
        source.load(Some(2), 40).await;

        let url = backend.last_url().unwrap();
        assert!(url.contains("category=business"));
        assert!(url.contains("page=2"));
        assert!(url.contains("pageSize=10"));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_load_error() {
        let (api, _) = api_with_bodies(Vec::new());
        let source = HeadlinesSource::new(api, "id", None);
        // Exhausted backend answers 503
        let LoadResult::Error(e) = source.load(None, 10).await else {
            panic!("expected an error");
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_fallback_searches_category_keywords() {
        let (api, _) = api_with_bodies(Vec::new());
        let source = HeadlinesSource::new(api, "id", Some("technology".into())).edition(Edition::National);

        let fallback = source.fallback().unwrap();
        assert_eq!(
            fallback.describe(),
            "everything q=\"(teknologi OR technology OR tech) AND indonesia\""
        );
    }
}
