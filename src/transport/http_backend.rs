use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use url::Url;

use crate::app::TransportError;
use crate::config::TimeoutConfig;
use crate::transport::{HttpBackend, HttpResponse};

pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect())
            .read_timeout(timeouts.read())
            .timeout(timeouts.call())
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("newswire/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn execute(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await?;

        let status = response.status();

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}
