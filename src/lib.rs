//! gleaner: a personal feed ingestion service.
//!
//! Users register external content sources ("feeds"); the service fetches
//! each source document, parses it into candidate articles, deduplicates
//! against what is already stored, and keeps the feed's health state
//! current. The crate exposes:
//!
//! - [`feed`] - HTTP fetching and RSS/Atom parsing
//! - [`storage`] - SQLite persistence: feeds, articles, health transitions
//! - [`crawl`] - the job channel and worker pool tying the two together
//! - [`config`] - TOML service configuration

pub mod config;
pub mod crawl;
pub mod feed;
pub mod storage;
