use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// The sole message shape carried on the crawl channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlJob {
    pub feed_id: i64,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    /// All workers are gone; nothing will ever consume the job
    #[error("Crawl queue is closed")]
    Closed,
}

/// Producer handle for the crawl channel.
///
/// Feed-registration code holds one of these and enqueues a job whenever a
/// feed is created. Cheap to clone; dropping every trigger closes the
/// channel and lets the workers drain and exit.
#[derive(Clone)]
pub struct CrawlTrigger {
    tx: mpsc::Sender<CrawlJob>,
}

impl CrawlTrigger {
    /// Enqueue a crawl for the given feed.
    ///
    /// Delivery within this process is reliable but consumption is
    /// at-least-once from the worker's point of view: callers are free to
    /// enqueue the same feed twice, and the worker's dedup key makes the
    /// second crawl harmless.
    pub async fn enqueue(&self, feed_id: i64) -> Result<(), TriggerError> {
        self.tx
            .send(CrawlJob { feed_id })
            .await
            .map_err(|_| TriggerError::Closed)
    }
}

/// Consumer handle for the crawl channel.
///
/// Clones share one receiver behind an async mutex so any number of worker
/// tasks can pull jobs; each job is delivered to exactly one of them.
#[derive(Clone)]
pub struct CrawlQueue {
    rx: Arc<Mutex<mpsc::Receiver<CrawlJob>>>,
}

impl CrawlQueue {
    /// Receive the next job, or `None` once every trigger has been dropped
    /// and the backlog is drained.
    pub async fn recv(&self) -> Option<CrawlJob> {
        self.rx.lock().await.recv().await
    }
}

/// Create a bounded crawl channel.
///
/// The capacity bounds how far registration can run ahead of the workers;
/// `enqueue` applies backpressure once it is full.
pub fn crawl_channel(capacity: usize) -> (CrawlTrigger, CrawlQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        CrawlTrigger { tx },
        CrawlQueue {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}
