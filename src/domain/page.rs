use std::sync::Arc;

use crate::app::NewsError;
use crate::domain::Article;

/// Page numbers are the cursors; the first page is 1.
pub type Cursor = u32;

pub const FIRST_PAGE: Cursor = 1;

/// One fetched page of articles plus its neighbouring cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Article>,
    pub prev_cursor: Option<Cursor>,
    /// `None` means end of stream
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Build page `page` from already-filtered items. An empty page ends the stream.
    pub fn numbered(page: Cursor, items: Vec<Article>) -> Self {
        let prev_cursor = if page <= FIRST_PAGE { None } else { Some(page - 1) };
        let next_cursor = if items.is_empty() { None } else { Some(page + 1) };
        Self {
            items,
            prev_cursor,
            next_cursor,
        }
    }

    /// Cursor to reload around this page when resuming from it.
    pub fn refresh_key(&self) -> Option<Cursor> {
        self.prev_cursor
            .map(|prev| prev + 1)
            .or_else(|| self.next_cursor.map(|next| next.saturating_sub(1)))
    }
}

#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(Arc<NewsError>),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }

    pub fn error(&self) -> Option<&NewsError> {
        match self {
            LoadState::Error(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Everything a consumer needs to render one paged list.
#[derive(Debug, Clone, Default)]
pub struct PagingSnapshot {
    /// Ordered, URL-deduplicated items of every page loaded in this generation
    pub items: Vec<Article>,
    pub refresh: LoadState,
    pub append: LoadState,
    /// True once the last loaded page reported no next cursor
    pub end_of_stream: bool,
    pub generation: u64,
}

impl PagingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_loading(&self) -> bool {
        self.refresh.is_loading() || self.append.is_loading()
    }

    /// Message of whichever slot failed, for an inline retry affordance.
    pub fn error_message(&self) -> Option<String> {
        self.refresh
            .error()
            .or_else(|| self.append.error())
            .map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| Article {
                url: Some(format!("https://example.com/{i}")),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_first_page_has_no_prev() {
        let page = Page::numbered(1, items(3));
        assert_eq!(page.prev_cursor, None);
        assert_eq!(page.next_cursor, Some(2));
    }

    #[test]
    fn test_empty_page_ends_stream() {
        let page = Page::numbered(4, Vec::new());
        assert_eq!(page.prev_cursor, Some(3));
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_refresh_key_prefers_prev() {
        assert_eq!(Page::numbered(3, items(1)).refresh_key(), Some(3));
        assert_eq!(Page::numbered(1, items(1)).refresh_key(), Some(1));
        assert_eq!(Page::numbered(1, Vec::new()).refresh_key(), None);
    }

    #[test]
    fn test_snapshot_error_message() {
        let snapshot = PagingSnapshot {
            append: LoadState::Error(Arc::new(NewsError::Other("boom".into()))),
            ..Default::default()
        };
        assert_eq!(snapshot.error_message().as_deref(), Some("boom"));
        assert!(!snapshot.is_loading());
    }
}
