use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StorageError {
    /// A feed with the same (url, owner) pair already exists
    #[error("Feed already registered for this user: {0}")]
    DuplicateFeed(String),

    /// The source URL is not an absolute http(s) URL
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    /// A row carried a status value outside the known set
    #[error("Unknown feed status in database: {0}")]
    UnknownStatus(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

// ============================================================================
// Feed Health
// ============================================================================

/// Operational state of a feed, reflecting the outcome of its most recent
/// crawl or an explicit user action.
///
/// `Paused` is user-controlled: the crawl worker never sets it and never
/// clears it. The worker only moves feeds between `Active` and `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Active,
    Paused,
    Error,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Active => "active",
            FeedStatus::Paused => "paused",
            FeedStatus::Error => "error",
        }
    }

    pub(crate) fn from_db(value: &str) -> Result<Self, StorageError> {
        match value {
            "active" => Ok(FeedStatus::Active),
            "paused" => Ok(FeedStatus::Paused),
            "error" => Ok(FeedStatus::Error),
            other => Err(StorageError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Helper Types
// ============================================================================

/// Row type for feed queries (status decoded separately into FeedStatus)
pub(crate) type FeedRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    i64,
    Option<i64>,
    i64, // unread_count
);

/// A candidate article staged for insertion during a crawl.
///
/// Produced by the crawl worker from fetcher output; never read back out of
/// the database in this shape.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub guid: String,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<i64>,
}

// ============================================================================
// Data Structures
// ============================================================================

/// Feed data from database
#[derive(Debug, Clone)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub status: FeedStatus,
    pub last_error: Option<String>,
    pub last_fetched: Option<i64>,
    pub owner_id: i64,
    pub category_id: Option<i64>,
    pub unread_count: i64,
}

impl Feed {
    pub(crate) fn from_row(row: FeedRow) -> Result<Self, StorageError> {
        let (id, url, title, status, last_error, last_fetched, owner_id, category_id, unread_count) =
            row;
        Ok(Feed {
            id,
            url,
            title,
            status: FeedStatus::from_db(&status)?,
            last_error,
            last_fetched,
            owner_id,
            category_id,
            unread_count,
        })
    }
}

/// Article data from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub guid: String,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub read: bool,
    pub published: Option<i64>,
    pub created_at: i64,
}
