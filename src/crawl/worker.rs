use crate::crawl::queue::{CrawlJob, CrawlQueue};
use crate::feed::{FeedFetcher, FetchedArticle};
use crate::storage::{Database, NewArticle, StorageError};
use tokio::task::JoinHandle;

/// What one crawl job amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Crawl succeeded; `inserted` counts only newly stored articles
    Ingested { inserted: usize },
    /// The job referenced a feed that no longer exists
    StaleJob,
    /// Fetch or parse failed; the feed was transitioned to `error`
    FetchFailed,
}

/// Consumes crawl jobs: fetch, deduplicate, persist, update feed health.
///
/// The worker is the only writer of feed health fields and the only creator
/// of articles. Fetch failures are terminal per job: the feed records the
/// error and the job completes normally, so the channel never redelivers a
/// crawl that already failed on its own merits.
#[derive(Clone)]
pub struct CrawlWorker {
    db: Database,
    fetcher: FeedFetcher,
}

impl CrawlWorker {
    pub fn new(db: Database, fetcher: FeedFetcher) -> Self {
        Self { db, fetcher }
    }

    /// Process a single crawl job to completion.
    ///
    /// # Errors
    ///
    /// Only storage failures bubble up. A missing feed or a failed fetch is
    /// handled locally and reported through the returned [`CrawlOutcome`].
    pub async fn handle(&self, job: CrawlJob) -> Result<CrawlOutcome, StorageError> {
        let feed = match self.db.find_feed(job.feed_id).await? {
            Some(feed) => feed,
            None => {
                // Stale job for a deleted feed: acknowledged, not retried
                tracing::warn!(
                    feed_id = job.feed_id,
                    "Crawl job references a missing feed, skipping"
                );
                return Ok(CrawlOutcome::StaleJob);
            }
        };

        let fetched = match self.fetcher.fetch(&feed.url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let message = e.to_string();
                tracing::error!(
                    feed_id = feed.id,
                    url = %feed.url,
                    error = %message,
                    "Feed crawl failed"
                );
                self.db.mark_crawl_failure(feed.id, &message).await?;
                return Ok(CrawlOutcome::FetchFailed);
            }
        };

        // Stage candidates in fetch order, skipping anything already stored.
        // Ingestion is create-only: an existing article is never updated from
        // a later fetch.
        let mut staged = Vec::new();
        for candidate in fetched.articles {
            if self.db.article_exists(feed.id, &candidate.guid).await? {
                continue;
            }
            staged.push(stage(candidate));
        }

        let inserted = self
            .db
            .commit_crawl(feed.id, fetched.title.as_deref(), &staged)
            .await?;

        tracing::info!(feed_id = feed.id, inserted = inserted, "Feed crawl complete");
        Ok(CrawlOutcome::Ingested { inserted })
    }

    /// Consume jobs until the channel closes.
    ///
    /// Storage failures abort the job, not the worker: they are logged and
    /// the loop moves on, leaving the feed for a later crawl.
    pub async fn run(self, queue: CrawlQueue) {
        while let Some(job) = queue.recv().await {
            if let Err(e) = self.handle(job).await {
                tracing::error!(
                    feed_id = job.feed_id,
                    error = %e,
                    "Crawl aborted by storage failure"
                );
            }
        }
    }
}

/// Spawn `count` worker tasks sharing one queue.
pub fn spawn_pool(worker: CrawlWorker, queue: CrawlQueue, count: usize) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let worker = worker.clone();
            let queue = queue.clone();
            tokio::spawn(worker.run(queue))
        })
        .collect()
}

fn stage(candidate: FetchedArticle) -> NewArticle {
    NewArticle {
        guid: candidate.guid,
        title: candidate.title,
        url: candidate.url,
        summary: candidate.summary,
        content: candidate.content,
        author: candidate.author,
        image_url: candidate.image_url,
        published: candidate.published,
    }
}
