//! Generation-scoped incremental loader.
//!
//! Every refresh (and every rebind to a new source) starts a new generation.
//! Loads carry the generation they were issued in; a completion whose
//! generation is no longer current is dropped instead of being merged.
//! Refresh and append each allow one load in flight at a time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Article, Cursor, LoadState, Page, PagingSnapshot};
use crate::paging::{LoadResult, PageSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Refresh,
    Append,
}

#[derive(Debug, Clone, Copy)]
struct FailedLoad {
    kind: LoadKind,
    cursor: Option<Cursor>,
}

struct Ticket {
    generation: u64,
    kind: LoadKind,
    cursor: Option<Cursor>,
    source: Arc<dyn PageSource>,
}

struct EngineState {
    generation: u64,
    source: Arc<dyn PageSource>,
    pages: Vec<Page>,
    items: Vec<Article>,
    seen: HashSet<String>,
    refresh: LoadState,
    append: LoadState,
    failed: Option<FailedLoad>,
    fallback_used: bool,
}

impl EngineState {
    fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            generation: 0,
            source,
            pages: Vec::new(),
            items: Vec::new(),
            seen: HashSet::new(),
            refresh: LoadState::Idle,
            append: LoadState::Idle,
            failed: None,
            fallback_used: false,
        }
    }

    fn next_cursor(&self) -> Option<Cursor> {
        self.pages.last().and_then(|page| page.next_cursor)
    }

    fn snapshot(&self) -> PagingSnapshot {
        PagingSnapshot {
            items: self.items.clone(),
            refresh: self.refresh.clone(),
            append: self.append.clone(),
            end_of_stream: !self.pages.is_empty() && self.next_cursor().is_none(),
            generation: self.generation,
        }
    }

    fn ticket(&self, kind: LoadKind, cursor: Option<Cursor>) -> Ticket {
        Ticket {
            generation: self.generation,
            kind,
            cursor,
            source: self.source.clone(),
        }
    }

    /// Items stay visible until the new first page replaces them.
    fn start_refresh(&mut self) -> Ticket {
        self.generation += 1;
        self.refresh = LoadState::Loading;
        self.append = LoadState::Idle;
        self.failed = None;
        self.ticket(LoadKind::Refresh, None)
    }

    fn rebind(&mut self, source: Arc<dyn PageSource>) {
        self.generation += 1;
        self.source = source;
        self.pages.clear();
        self.items.clear();
        self.seen.clear();
        self.refresh = LoadState::Idle;
        self.append = LoadState::Idle;
        self.failed = None;
        self.fallback_used = false;
    }

    fn replace_pages(&mut self, page: Page) {
        self.pages.clear();
        self.items.clear();
        self.seen.clear();
        self.append_page(page);
    }

    /// Returns how many items were new.
    fn append_page(&mut self, page: Page) -> usize {
        let before = self.items.len();
        for article in page.items.iter() {
            if let Some(key) = article.key() {
                if self.seen.insert(key.to_string()) {
                    self.items.push(article.clone());
                }
            }
        }
        self.pages.push(page);
        self.items.len() - before
    }

    /// An empty first page gets one retry against the source's fallback.
    fn escalate_if_empty(&mut self) -> Option<Ticket> {
        if !self.items.is_empty() || self.fallback_used {
            return None;
        }

        let fallback = self.source.fallback()?;
        info!(
            "{} returned nothing, retrying once with {}",
            self.source.describe(),
            fallback.describe()
        );
        self.fallback_used = true;
        self.source = fallback;
        Some(self.start_refresh())
    }
}

struct Inner {
    page_size: u32,
    state: Mutex<EngineState>,
    snapshot_tx: watch::Sender<PagingSnapshot>,
}

/// Cheaply cloneable handle; clones drive the same engine.
#[derive(Clone)]
pub struct PagingEngine {
    inner: Arc<Inner>,
}

impl PagingEngine {
    pub fn new(source: Arc<dyn PageSource>, page_size: u32) -> Self {
        let state = EngineState::new(source);
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                page_size,
                state: Mutex::new(state),
                snapshot_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PagingSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PagingSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Reload from the first page. No-op while a refresh is in flight.
    pub async fn refresh(&self) {
        let ticket = {
            let mut state = self.lock();
            if state.refresh.is_loading() {
                debug!("{}: refresh already in flight", state.source.describe());
                return;
            }
            let ticket = state.start_refresh();
            self.publish(&state);
            ticket
        };

        self.run(ticket).await;
    }

    /// Load the page after the last one. No-op unless the first page is
    /// loaded, no append is pending or failed, and the stream has not ended.
    pub async fn load_more(&self) {
        let ticket = {
            let mut state = self.lock();
            if !state.refresh.is_loaded() {
                return;
            }
            if matches!(state.append, LoadState::Loading | LoadState::Error(_)) {
                debug!("{}: append busy or failed, ignoring load_more", state.source.describe());
                return;
            }
            let Some(cursor) = state.next_cursor() else {
                return;
            };

            state.append = LoadState::Loading;
            let ticket = state.ticket(LoadKind::Append, Some(cursor));
            self.publish(&state);
            ticket
        };

        self.run(ticket).await;
    }

    /// Re-issue whichever load last failed, with the same cursor.
    pub async fn retry(&self) {
        let ticket = {
            let mut state = self.lock();
            let failed = state.failed;
            let ticket = match failed {
                Some(FailedLoad {
                    kind: LoadKind::Refresh,
                    ..
                }) if state.refresh.error().is_some() => state.start_refresh(),
                Some(FailedLoad {
                    kind: LoadKind::Append,
                    cursor,
                }) if state.append.error().is_some() && state.refresh.is_loaded() => {
                    state.append = LoadState::Loading;
                    state.failed = None;
                    state.ticket(LoadKind::Append, cursor)
                }
                _ => {
                    debug!("{}: nothing to retry", state.source.describe());
                    return;
                }
            };
            self.publish(&state);
            ticket
        };

        self.run(ticket).await;
    }

    /// Bind a new source: a fresh generation with an empty snapshot. In-flight
    /// loads of the previous generation will be discarded on completion.
    pub fn rebind(&self, source: Arc<dyn PageSource>) {
        let mut state = self.lock();
        state.rebind(source);
        info!(
            "Generation {} bound to {}",
            state.generation,
            state.source.describe()
        );
        self.publish(&state);
    }

    /// Cursor to resume from when the consumer was last looking at the loaded
    /// page at index `anchor_page`.
    pub fn refresh_key(&self, anchor_page: usize) -> Option<Cursor> {
        let state = self.lock();
        state.source.refresh_key(&state.pages, anchor_page)
    }

    /// Wait until a refresh has been issued and nothing is loading.
    pub async fn settled(&self) -> PagingSnapshot {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|s| !s.is_loading() && !matches!(s.refresh, LoadState::Idle))
            .await
            .map(|snapshot| (*snapshot).clone());

        settled.unwrap_or_else(|_| self.snapshot())
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &EngineState) {
        self.inner.snapshot_tx.send_replace(state.snapshot());
    }

    async fn run(&self, mut ticket: Ticket) {
        loop {
            let result = ticket
                .source
                .load(ticket.cursor, self.inner.page_size)
                .await;

            match self.apply(ticket, result) {
                Some(next) => ticket = next,
                None => break,
            }
        }
    }

    fn apply(&self, ticket: Ticket, result: LoadResult) -> Option<Ticket> {
        let mut state = self.lock();

        if ticket.generation != state.generation {
            debug!(
                "Discarding {:?} result for cursor {:?} from generation {} (current {})",
                ticket.kind, ticket.cursor, ticket.generation, state.generation
            );
            return None;
        }

        let next = match result {
            LoadResult::Page(page) => match ticket.kind {
                LoadKind::Refresh => {
                    state.replace_pages(page);
                    state.refresh = LoadState::Loaded;
                    info!(
                        "{}: first page loaded with {} items",
                        ticket.source.describe(),
                        state.items.len()
                    );
                    state.escalate_if_empty()
                }
                LoadKind::Append => {
                    let added = state.append_page(page);
                    state.append = LoadState::Loaded;
                    info!(
                        "{}: page {:?} appended {} new items ({} total)",
                        ticket.source.describe(),
                        ticket.cursor,
                        added,
                        state.items.len()
                    );
                    None
                }
            },
            LoadResult::Error(e) => {
                warn!(
                    "{}: {:?} load for cursor {:?} failed: {}",
                    ticket.source.describe(),
                    ticket.kind,
                    ticket.cursor,
                    e
                );
                let cause = LoadState::Error(Arc::new(e));
                match ticket.kind {
                    LoadKind::Refresh => state.refresh = cause,
                    LoadKind::Append => state.append = cause,
                }
                state.failed = Some(FailedLoad {
                    kind: ticket.kind,
                    cursor: ticket.cursor,
                });
                None
            }
        };

        self.publish(&state);
        next
    }
}
