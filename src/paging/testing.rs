//! Shared fixtures for paging tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

use crate::api::ApiClient;
use crate::app::{NewsError, TransportError};
use crate::domain::{Article, Cursor, Page, FIRST_PAGE};
use crate::paging::{LoadResult, PageSource};
use crate::transport::{HttpBackend, HttpResponse, RateLimitPolicy, RateLimitedTransport};

/// Backend answering with queued bodies, then 503 once they run out.
pub struct QueuedBackend {
    bodies: Mutex<VecDeque<String>>,
    urls: Mutex<Vec<String>>,
}

impl QueuedBackend {
    pub fn last_url(&self) -> Option<String> {
        self.urls.lock().unwrap().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpBackend for QueuedBackend {
    async fn execute(&self, url: &Url, _headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());
        match self.bodies.lock().unwrap().pop_front() {
            Some(body) => Ok(HttpResponse::ok(body)),
            None => Ok(HttpResponse {
                status: StatusCode::SERVICE_UNAVAILABLE,
                retry_after: None,
                body: "unavailable".into(),
            }),
        }
    }
}

pub fn api_with_bodies(bodies: Vec<String>) -> (Arc<ApiClient>, Arc<QueuedBackend>) {
    let backend = Arc::new(QueuedBackend {
        bodies: Mutex::new(bodies.into()),
        urls: Mutex::new(Vec::new()),
    });
    let policy = RateLimitPolicy {
        min_spacing: Duration::ZERO,
        ..RateLimitPolicy::default()
    };
    let transport = RateLimitedTransport::new(backend.clone(), "https://newsapi.org/", "test-key", policy)
        .expect("valid transport");
    (Arc::new(ApiClient::new(Arc::new(transport))), backend)
}

/// An "ok" envelope holding one article per entry of `urls`.
pub fn articles_body(urls: &[Option<&str>]) -> String {
    let articles: Vec<Article> = urls.iter().map(|url| article(*url)).collect();
    serde_json::json!({
        "status": "ok",
        "totalResults": articles.len(),
        "articles": articles,
    })
    .to_string()
}

pub fn article(url: Option<&str>) -> Article {
    Article {
        title: url.map(|u| format!("Title for {u}")),
        url: url.map(String::from),
        ..Default::default()
    }
}

pub fn urls(items: &[Article]) -> Vec<&str> {
    items.iter().filter_map(Article::key).collect()
}

/// What a [`ScriptedSource`] answers for one cursor.
#[derive(Clone)]
pub enum Step {
    Items(Vec<&'static str>),
    Fail(&'static str),
}

/// In-memory page source keyed by page number, with an optional delay per
/// load and an optional fallback.
pub struct ScriptedSource {
    name: &'static str,
    pages: Mutex<HashMap<Cursor, VecDeque<Step>>>,
    delay: Duration,
    fallback: Option<Arc<ScriptedSource>>,
    loads: Mutex<Vec<Option<Cursor>>>,
}

impl ScriptedSource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pages: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            fallback: None,
            loads: Mutex::new(Vec::new()),
        }
    }

    /// Queue an answer for `page`; the last queued answer repeats.
    pub fn page(self, page: Cursor, step: Step) -> Self {
        self.pages.lock().unwrap().entry(page).or_default().push_back(step);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fallback(mut self, fallback: Arc<ScriptedSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn loads(&self) -> Vec<Option<Cursor>> {
        self.loads.lock().unwrap().clone()
    }

    fn next_step(&self, page: Cursor) -> Step {
        let mut pages = self.pages.lock().unwrap();
        match pages.get_mut(&page) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Step::Items(Vec::new())),
            Some(queue) => queue.front().cloned().unwrap_or(Step::Items(Vec::new())),
            None => Step::Items(Vec::new()),
        }
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn load(&self, cursor: Option<Cursor>, _page_size_hint: u32) -> LoadResult {
        self.loads.lock().unwrap().push(cursor);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let page = cursor.unwrap_or(FIRST_PAGE);
        match self.next_step(page) {
            Step::Items(urls) => {
                let items = urls.into_iter().map(|u| article(Some(u))).collect();
                LoadResult::Page(Page::numbered(page, items))
            }
            Step::Fail(message) => {
                LoadResult::Error(NewsError::Transport(TransportError::Network(message.into())))
            }
        }
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }

    fn fallback(&self) -> Option<Arc<dyn PageSource>> {
        self.fallback
            .clone()
            .map(|source| source as Arc<dyn PageSource>)
    }
}
