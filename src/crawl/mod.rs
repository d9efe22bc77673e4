//! The ingestion pipeline: a job channel feeding a pool of crawl workers.
//!
//! Feed registration enqueues a [`CrawlJob`] through a [`CrawlTrigger`];
//! workers consume jobs from the shared [`CrawlQueue`], fetch the source
//! document, deduplicate against stored articles on (feed, guid), and commit
//! new articles together with the feed's health update in one transaction.
//!
//! Jobs are independent across feeds and carry no ordering guarantee. Two
//! concurrent crawls of the same feed are tolerated: the article uniqueness
//! constraint turns the loser's duplicate inserts into no-ops.

mod queue;
mod worker;

pub use queue::{crawl_channel, CrawlJob, CrawlQueue, CrawlTrigger, TriggerError};
pub use worker::{spawn_pool, CrawlOutcome, CrawlWorker};
