//! # Newswire
//!
//! A rate-limited client for a newsapi.org-style service with incremental,
//! deduplicating pagination.
//!
//! ## Architecture
//!
//! ```text
//! QueryController → PagingEngine → PageSource → ApiClient → RateLimitedTransport → HttpBackend
//! ```
//!
//! Every upstream call passes through one [`RateLimitedTransport`](transport::RateLimitedTransport):
//! calls are serialized, spaced apart, and a `429` is retried once after
//! honoring `Retry-After`.
//!
//! ## Quick Start
//!
//! ```bash
//! export NEWS_API_KEY=...
//!
//! # Top headlines, two pages
//! newswire headlines --category business --pages 2
//!
//! # Search
//! newswire search "pemilu" --from 2024-01-01 --to 2024-01-31
//!
//! # Interactive session
//! newswire browse
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together transport,
/// API client and paging defaults.
pub mod app;

/// Configuration loaded from `~/.config/newswire/config.toml`.
pub mod config;

/// Command-line interface using clap.
///
/// - `headlines [--category C] [--pages N]`
/// - `search [QUERY] [--from D] [--to D] [--language L] [--pages N]`
/// - `browse` - interactive session over a [`QueryController`](query::QueryController)
pub mod cli;

/// Core domain models.
///
/// - [`Article`](domain::Article) and the [`NewsResponse`](domain::NewsResponse) envelope
/// - [`Page`](domain::Page), [`LoadState`](domain::LoadState) and [`PagingSnapshot`](domain::PagingSnapshot)
/// - [`QueryParameters`](domain::QueryParameters)
pub mod domain;

/// Rate-limited HTTP gateway.
///
/// - [`HttpBackend`](transport::HttpBackend): Async trait for a single HTTP GET
/// - [`ReqwestBackend`](transport::ReqwestBackend): reqwest-based implementation
/// - [`RateLimitedTransport`](transport::RateLimitedTransport): single-flight pacing, 429 retry, response cache
pub mod transport;

/// Typed requests for the `top-headlines` and `everything` endpoints.
pub mod api;

/// Page sources and the incremental [`PagingEngine`](paging::PagingEngine).
pub mod paging;

/// Debounced query parameters driving the paging engines.
pub mod query;
