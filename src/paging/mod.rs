//! Incremental, cursor-based loading of article pages.
//!
//! ```text
//! PageSource (Headlines | Everything) → PagingEngine → PagingSnapshot
//! ```
//!
//! A [`PageSource`] turns a cursor into one upstream call and never fails
//! across its boundary: every error becomes [`LoadResult::Error`]. The
//! [`PagingEngine`] drives a source, keeps the loaded pages, and publishes a
//! deduplicated [`PagingSnapshot`](crate::domain::PagingSnapshot).

pub mod categories;
pub mod engine;
pub mod everything;
pub mod headlines;

#[cfg(test)]
pub(crate) mod testing;

pub use categories::{category_query, fallback_query};
pub use engine::PagingEngine;
pub use everything::EverythingSource;
pub use headlines::HeadlinesSource;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::NewsError;
use crate::config::PagingConfig;
use crate::domain::{Article, Cursor, Page};

#[derive(Debug)]
pub enum LoadResult {
    Page(Page),
    Error(NewsError),
}

impl LoadResult {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadResult::Error(_))
    }
}

/// Upper bounds on the page size each endpoint is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizeLimits {
    pub headlines: u32,
    pub everything: u32,
}

impl Default for PageSizeLimits {
    fn default() -> Self {
        Self::from(&PagingConfig::default())
    }
}

impl From<&PagingConfig> for PageSizeLimits {
    fn from(config: &PagingConfig) -> Self {
        Self {
            headlines: config.headlines_max_page_size,
            everything: config.everything_max_page_size,
        }
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Load the page at `cursor` (`None` = first page).
    async fn load(&self, cursor: Option<Cursor>, page_size_hint: u32) -> LoadResult;

    /// Short human-readable label for logs.
    fn describe(&self) -> String;

    /// Source to try once when the first page comes back empty.
    fn fallback(&self) -> Option<Arc<dyn PageSource>> {
        None
    }

    /// Cursor to reload around the loaded page at index `anchor_page`.
    fn refresh_key(&self, pages: &[Page], anchor_page: usize) -> Option<Cursor> {
        pages.get(anchor_page).and_then(Page::refresh_key)
    }
}

/// Never ask upstream for more than the source's cap.
pub fn effective_page_size(hint: u32, max: u32) -> u32 {
    hint.min(max).max(1)
}

/// Articles without a usable URL cannot be opened and are dropped silently.
pub fn linkable(articles: Vec<Article>) -> Vec<Article> {
    articles.into_iter().filter(Article::has_link).collect()
}
