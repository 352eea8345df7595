pub mod article;
pub mod page;
pub mod query;

pub use article::{Article, NewsResponse, Source};
pub use page::{Cursor, LoadState, Page, PagingSnapshot, FIRST_PAGE};
pub use query::{non_blank, Edition, QueryParameters};
