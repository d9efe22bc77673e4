//! Feed retrieval: fetching a source document over HTTP and parsing it
//! into candidate articles.
//!
//! - [`parser`] - Low-level feed parsing using the `feed-rs` crate
//! - [`fetcher`] - Bounded HTTP retrieval, one attempt per call
//!
//! The fetcher knows nothing about storage or feed health; it turns a URL
//! into a [`FetchedFeed`] or a [`FetchError`] and leaves the consequences
//! to the crawl worker.

mod fetcher;
mod parser;

pub use fetcher::{FeedFetcher, FetchError, DEFAULT_TIMEOUT};
pub use parser::{parse_feed, FetchedArticle, FetchedFeed};
