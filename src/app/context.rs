use std::sync::Arc;

use crate::api::ApiClient;
use crate::app::error::Result;
use crate::config::Config;
use crate::domain::QueryParameters;
use crate::paging::PageSizeLimits;
use crate::query::{ApiSourceFactory, QueryController};
use crate::transport::{HttpBackend, RateLimitedTransport, ReqwestBackend};

/// Wires the transport, API client and paging defaults from one [`Config`].
pub struct AppContext {
    pub config: Config,
    pub transport: Arc<RateLimitedTransport>,
    pub api: Arc<ApiClient>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let backend = ReqwestBackend::new(&config.timeouts)?;
        Self::with_backend(config, Arc::new(backend))
    }

    pub fn with_backend(config: Config, backend: Arc<dyn HttpBackend + Send + Sync>) -> Result<Self> {
        let transport = Arc::new(RateLimitedTransport::from_config(backend, &config)?);
        let api = Arc::new(ApiClient::new(transport.clone()));

        Ok(Self {
            config,
            transport,
            api,
        })
    }

    pub fn limits(&self) -> PageSizeLimits {
        PageSizeLimits::from(&self.config.paging)
    }

    pub fn page_size(&self) -> u32 {
        self.config.paging.page_size
    }

    /// Parameters a fresh session starts from.
    pub fn initial_parameters(&self) -> QueryParameters {
        QueryParameters::new(self.config.api.default_query.clone())
            .with_language(self.config.api.language.clone())
    }

    /// Build a controller over this context. Needs a running tokio runtime.
    pub fn query_controller(&self) -> QueryController {
        let factory = ApiSourceFactory::new(self.api.clone(), self.config.api.country.clone(), self.limits());
        QueryController::new(
            Arc::new(factory),
            self.initial_parameters(),
            self.page_size(),
            self.config.paging.debounce(),
        )
    }
}
