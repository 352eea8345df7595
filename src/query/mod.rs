//! Reactive holder of the current query parameters.
//!
//! Setters publish into a watch channel. A background task waits for the
//! input to go quiet for the debounce period, then rebinds each paging engine
//! whose inputs actually changed to a freshly built source and refreshes it.
//! Must be constructed inside a tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::domain::{non_blank, Edition, PagingSnapshot, QueryParameters};
use crate::paging::{EverythingSource, HeadlinesSource, PageSizeLimits, PageSource, PagingEngine};

/// Builds the page sources bound to one parameter set.
pub trait SourceFactory: Send + Sync {
    fn headlines(&self, params: &QueryParameters) -> Arc<dyn PageSource>;
    fn everything(&self, params: &QueryParameters) -> Arc<dyn PageSource>;
}

pub struct ApiSourceFactory {
    api: Arc<ApiClient>,
    country: String,
    limits: PageSizeLimits,
}

impl ApiSourceFactory {
    pub fn new(api: Arc<ApiClient>, country: impl Into<String>, limits: PageSizeLimits) -> Self {
        Self {
            api,
            country: country.into(),
            limits,
        }
    }
}

impl SourceFactory for ApiSourceFactory {
    fn headlines(&self, params: &QueryParameters) -> Arc<dyn PageSource> {
        Arc::new(
            HeadlinesSource::new(self.api.clone(), self.country.clone(), params.category.clone())
                .edition(params.edition)
                .limits(self.limits),
        )
    }

    fn everything(&self, params: &QueryParameters) -> Arc<dyn PageSource> {
        Arc::new(EverythingSource::for_parameters(
            self.api.clone(),
            params,
            self.limits,
        ))
    }
}

fn headlines_inputs_changed(old: &QueryParameters, new: &QueryParameters) -> bool {
    old.category != new.category || old.edition != new.edition
}

pub struct QueryController {
    params_tx: watch::Sender<QueryParameters>,
    applied_tx: Arc<watch::Sender<QueryParameters>>,
    headlines: PagingEngine,
    everything: PagingEngine,
    worker: JoinHandle<()>,
}

impl QueryController {
    pub fn new(
        factory: Arc<dyn SourceFactory>,
        initial: QueryParameters,
        page_size: u32,
        debounce: Duration,
    ) -> Self {
        let headlines = PagingEngine::new(factory.headlines(&initial), page_size);
        let everything = PagingEngine::new(factory.everything(&initial), page_size);
        spawn_refresh(&headlines);
        spawn_refresh(&everything);

        let (params_tx, params_rx) = watch::channel(initial.clone());
        let applied_tx = Arc::new(watch::Sender::new(initial));

        let worker = tokio::spawn(run_worker(
            params_rx,
            applied_tx.clone(),
            factory,
            headlines.clone(),
            everything.clone(),
            debounce,
        ));

        Self {
            params_tx,
            applied_tx,
            headlines,
            everything,
            worker,
        }
    }

    pub fn headlines(&self) -> &PagingEngine {
        &self.headlines
    }

    pub fn everything(&self) -> &PagingEngine {
        &self.everything
    }

    pub fn parameters(&self) -> QueryParameters {
        self.params_tx.borrow().clone()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.update(|p| replace(&mut p.query, query));
    }

    pub fn set_category(&self, category: Option<String>) {
        let category = non_blank(category);
        self.update(|p| replace(&mut p.category, category));
    }

    pub fn set_date_window(&self, from: Option<String>, to: Option<String>) {
        let from = non_blank(from);
        let to = non_blank(to);
        self.update(|p| {
            let from_changed = replace(&mut p.date_from, from);
            let to_changed = replace(&mut p.date_to, to);
            from_changed || to_changed
        });
    }

    pub fn set_language(&self, language: Option<String>) {
        let language = non_blank(language);
        self.update(|p| replace(&mut p.language, language));
    }

    pub fn set_edition(&self, edition: Edition) {
        self.update(|p| replace(&mut p.edition, edition));
    }

    /// Wait until the latest parameters are bound and both engines are idle.
    pub async fn settled(&self) -> (PagingSnapshot, PagingSnapshot) {
        let target = self.parameters();
        let mut applied = self.applied_tx.subscribe();
        // The sender lives in self, so this only ends once the target is applied.
        let _ = applied.wait_for(|p| *p == target).await;

        futures::future::join(self.headlines.settled(), self.everything.settled()).await
    }

    fn update(&self, modify: impl FnOnce(&mut QueryParameters) -> bool) {
        if self.params_tx.send_if_modified(modify) {
            debug!("Query parameters changed: {:?}", self.params_tx.borrow());
        }
    }
}

impl Drop for QueryController {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Assign `value` if it differs; report whether it did.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn spawn_refresh(engine: &PagingEngine) {
    let engine = engine.clone();
    tokio::spawn(async move { engine.refresh().await });
}

async fn run_worker(
    mut params_rx: watch::Receiver<QueryParameters>,
    applied_tx: Arc<watch::Sender<QueryParameters>>,
    factory: Arc<dyn SourceFactory>,
    headlines: PagingEngine,
    everything: PagingEngine,
    debounce: Duration,
) {
    let mut applied = params_rx.borrow_and_update().clone();

    loop {
        if params_rx.changed().await.is_err() {
            return;
        }

        // Restart the quiet period on every further change.
        loop {
            tokio::select! {
                changed = params_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = sleep(debounce) => break,
            }
        }

        let params = params_rx.borrow_and_update().clone();
        if params == applied {
            debug!("Parameters settled back to current values, nothing to restart");
            continue;
        }

        if headlines_inputs_changed(&applied, &params) {
            headlines.rebind(factory.headlines(&params));
            spawn_refresh(&headlines);
        }
        everything.rebind(factory.everything(&params));
        spawn_refresh(&everything);

        info!("Paging restarted for {:?}", params);
        applied = params;
        applied_tx.send_replace(applied.clone());
    }
}
