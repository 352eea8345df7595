//! Process-wide pacing for every call to the upstream host.
//!
//! All callers share one [`RateLimitedTransport`]. Requests are executed one
//! at a time behind an async mutex, consecutive dispatches are separated by
//! at least `min_spacing` measured from the previous completion, and a single
//! 429 is absorbed by waiting out `Retry-After` and retrying once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::app::{NewsError, Result, TransportError};
use crate::config::{Config, RateLimitConfig};
use crate::transport::cache::{fingerprint, ResponseCache};
use crate::transport::{ApiRequest, HttpBackend, HttpResponse};

pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub min_spacing: Duration,
    pub retry_after_fallback: Duration,
    pub retry_after_cap: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            min_spacing: config.min_spacing(),
            retry_after_fallback: config.retry_after_fallback(),
            retry_after_cap: config.retry_after_cap(),
        }
    }
}

impl RateLimitPolicy {
    /// How long to back off after a 429 carrying `header`.
    pub fn retry_after_wait(&self, header: Option<&str>) -> Duration {
        let requested = header
            .and_then(parse_retry_after)
            .unwrap_or(self.retry_after_fallback);

        if requested > self.retry_after_cap {
            warn!(
                "Retry-After of {:?} exceeds cap, waiting {:?} instead",
                requested, self.retry_after_cap
            );
            self.retry_after_cap
        } else {
            requested
        }
    }
}

/// Parse a `Retry-After` value given either as delta-seconds or an HTTP-date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

struct Gate {
    last_completed: Option<Instant>,
}

pub struct RateLimitedTransport {
    backend: Arc<dyn HttpBackend + Send + Sync>,
    base_url: Url,
    auth_headers: HeaderMap,
    policy: RateLimitPolicy,
    gate: tokio::sync::Mutex<Gate>,
    cache: Option<Mutex<ResponseCache>>,
}

impl RateLimitedTransport {
    /// A missing credential is a configuration error, never retried.
    pub fn new(
        backend: Arc<dyn HttpBackend + Send + Sync>,
        base_url: &str,
        api_key: &str,
        policy: RateLimitPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(NewsError::Config(format!(
                "No API key configured (set api.api_key or {})",
                crate::config::API_KEY_ENV
            )));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| NewsError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;

        let mut auth_headers = HeaderMap::new();
        let value = HeaderValue::from_str(api_key.trim())
            .map_err(|_| NewsError::Config("API key is not a valid header value".into()))?;
        auth_headers.insert(API_KEY_HEADER, value);

        Ok(Self {
            backend,
            base_url,
            auth_headers,
            policy,
            gate: tokio::sync::Mutex::new(Gate {
                last_completed: None,
            }),
            cache: None,
        })
    }

    pub fn from_config(backend: Arc<dyn HttpBackend + Send + Sync>, config: &Config) -> Result<Self> {
        let transport = Self::new(
            backend,
            &config.api.base_url,
            &config.api.api_key,
            RateLimitPolicy::from(&config.rate_limit),
        )?;

        Ok(if config.cache.enabled {
            transport.with_cache(config.cache.capacity, config.cache.ttl())
        } else {
            transport
        })
    }

    pub fn with_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.cache = Some(Mutex::new(ResponseCache::new(capacity, ttl)));
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn resolve(&self, request: &ApiRequest) -> std::result::Result<Url, TransportError> {
        let mut url = self.base_url.join(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    /// Execute `request` and return the body of a successful response.
    pub async fn send(&self, request: &ApiRequest) -> std::result::Result<String, TransportError> {
        let url = self.resolve(request)?;
        let key = fingerprint(url.as_str());

        if let Some(body) = self.cached(&key) {
            debug!("Cache hit for {}", url.path());
            return Ok(body);
        }

        let response = {
            let mut gate = self.gate.lock().await;

            // Another caller may have fetched the same URL while we queued.
            if let Some(body) = self.cached(&key) {
                debug!("Cache hit for {} after queueing", url.path());
                return Ok(body);
            }

            self.dispatch_paced(&mut gate, &url).await?
        };

        if !response.status.is_success() {
            return Err(TransportError::Status {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        self.store(key, &response.body);
        Ok(response.body)
    }

    async fn dispatch_paced(
        &self,
        gate: &mut Gate,
        url: &Url,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let first = self.dispatch_once(gate, url).await?;
        if first.status != StatusCode::TOO_MANY_REQUESTS {
            return Ok(first);
        }

        let wait = self.policy.retry_after_wait(first.retry_after.as_deref());
        warn!("Upstream returned 429 for {}, retrying once in {:?}", url.path(), wait);
        sleep(wait).await;

        self.dispatch_once(gate, url).await
    }

    async fn dispatch_once(
        &self,
        gate: &mut Gate,
        url: &Url,
    ) -> std::result::Result<HttpResponse, TransportError> {
        if let Some(last) = gate.last_completed {
            let elapsed = last.elapsed();
            if elapsed < self.policy.min_spacing {
                sleep(self.policy.min_spacing - elapsed).await;
            }
        }

        let started = Instant::now();
        let result = self.backend.execute(url, &self.auth_headers).await;
        gate.last_completed = Some(Instant::now());

        match &result {
            Ok(response) => debug!(
                "GET {} -> {} ({:?})",
                url.path(),
                response.status,
                started.elapsed()
            ),
            Err(e) => debug!("GET {} failed: {}", url.path(), e),
        }

        result
    }

    fn cached(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().ok()?;
        cache.get(key)
    }

    fn store(&self, key: String, body: &str) {
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.insert(key, body.to_string());
            }
        }
    }
}
