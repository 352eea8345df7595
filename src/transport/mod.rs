pub mod cache;
pub mod http_backend;
pub mod rate_limited;

pub use cache::ResponseCache;
pub use http_backend::ReqwestBackend;
pub use rate_limited::{parse_retry_after, RateLimitPolicy, RateLimitedTransport, API_KEY_HEADER};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

use crate::app::TransportError;

/// Raw upstream answer, before any status handling.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Value of the `Retry-After` header, if any
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            retry_after: None,
            body: body.into(),
        }
    }
}

/// One physical HTTP exchange. Implementations do no retrying or pacing.
#[async_trait]
pub trait HttpBackend {
    async fn execute(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError>;
}

/// A logical GET against the upstream API, relative to its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Add the parameter only when a value is present.
    pub fn param_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}
