//! Typed access to the two upstream endpoints.
//!
//! Each operation validates its parameters, maps them onto an [`ApiRequest`],
//! sends it through the shared [`RateLimitedTransport`] and parses the JSON
//! envelope. Transport failures and parse failures stay distinct so callers
//! can tell a retryable outage from a bad response.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::app::{NewsError, ParseError, Result};
use crate::domain::{non_blank, NewsResponse};
use crate::transport::{ApiRequest, RateLimitedTransport};

pub const TOP_HEADLINES_PATH: &str = "v2/top-headlines";
pub const EVERYTHING_PATH: &str = "v2/everything";
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SORT_BY: &str = "publishedAt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlinesRequest {
    pub country: String,
    /// `None` means all categories
    pub category: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl HeadlinesRequest {
    pub fn new(country: impl Into<String>, category: Option<String>, page: u32, page_size: u32) -> Self {
        Self {
            country: country.into(),
            category,
            page,
            page_size,
        }
    }

    pub fn to_api_request(&self) -> Result<ApiRequest> {
        if self.country.trim().is_empty() {
            return Err(NewsError::InvalidRequest("country must not be empty".into()));
        }
        validate_paging(self.page, self.page_size)?;

        let category = non_blank(self.category.clone());

        Ok(ApiRequest::get(TOP_HEADLINES_PATH)
            .param("country", self.country.trim())
            .param_opt("category", category.as_deref())
            .param("page", self.page)
            .param("pageSize", self.page_size))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EverythingRequest {
    pub query: String,
    pub sort_by: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub language: Option<String>,
}

impl EverythingRequest {
    pub fn new(query: impl Into<String>, page: u32, page_size: u32) -> Self {
        Self {
            query: query.into(),
            sort_by: DEFAULT_SORT_BY.to_string(),
            from: None,
            to: None,
            page,
            page_size,
            language: None,
        }
    }

    pub fn date_window(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn to_api_request(&self) -> Result<ApiRequest> {
        if self.query.trim().is_empty() {
            return Err(NewsError::InvalidRequest("query must not be empty".into()));
        }
        validate_paging(self.page, self.page_size)?;

        let from = non_blank(self.from.clone());
        let to = non_blank(self.to.clone());
        validate_date_window(from.as_deref(), to.as_deref())?;
        let language = non_blank(self.language.clone());

        Ok(ApiRequest::get(EVERYTHING_PATH)
            .param("q", self.query.trim())
            .param("sortBy", &self.sort_by)
            .param_opt("from", from.as_deref())
            .param_opt("to", to.as_deref())
            .param("page", self.page)
            .param("pageSize", self.page_size)
            .param_opt("language", language.as_deref()))
    }
}

pub struct ApiClient {
    transport: Arc<RateLimitedTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<RateLimitedTransport>) -> Self {
        Self { transport }
    }

    pub async fn top_headlines(
        &self,
        country: &str,
        category: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<NewsResponse> {
        let request =
            HeadlinesRequest::new(country, category.map(String::from), page, page_size).to_api_request()?;
        self.execute(&request).await
    }

    pub async fn everything(&self, request: &EverythingRequest) -> Result<NewsResponse> {
        let request = request.to_api_request()?;
        self.execute(&request).await
    }

    async fn execute(&self, request: &ApiRequest) -> Result<NewsResponse> {
        let body = self.transport.send(request).await?;
        let response = parse_response(&body)?;
        debug!(
            "{} returned {} articles (total {})",
            request.path,
            response.articles.len(),
            response.total_results
        );
        Ok(response)
    }
}

/// Parse a response body, rejecting malformed JSON and non-"ok" envelopes.
pub fn parse_response(body: &str) -> std::result::Result<NewsResponse, ParseError> {
    let mut response: NewsResponse = serde_json::from_str(body)
        .map_err(|e| ParseError::new(format!("malformed response body: {}", e), body))?;

    if !response.is_ok() {
        let reason = match (&response.code, &response.message) {
            (Some(code), Some(message)) => format!("upstream status {}: {} ({})", response.status, message, code),
            (_, Some(message)) => format!("upstream status {}: {}", response.status, message),
            _ => format!("upstream status {}", response.status),
        };
        return Err(ParseError::new(reason, body));
    }

    response.articles = response
        .articles
        .into_iter()
        .map(|article| article.normalized())
        .collect();

    Ok(response)
}

fn validate_paging(page: u32, page_size: u32) -> Result<()> {
    if page == 0 {
        return Err(NewsError::InvalidRequest("page numbers start at 1".into()));
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(NewsError::InvalidRequest(format!(
            "pageSize must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

fn validate_date_window(from: Option<&str>, to: Option<&str>) -> Result<()> {
    let from = from.map(parse_iso_date).transpose()?;
    let to = to.map(parse_iso_date).transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(NewsError::InvalidRequest(format!(
                "date window starts after it ends ({} > {})",
                from, to
            )));
        }
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and RFC 3339 timestamps.
fn parse_iso_date(value: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| NewsError::InvalidRequest(format!("not an ISO-8601 date: {}", value)))
}
