use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{Feed, FeedRow, FeedStatus, NewArticle, StorageError};

/// Shared SELECT for feed rows with their unread article counts.
const FEED_SELECT: &str = r#"
    SELECT
        f.id, f.url, f.title, f.status, f.last_error, f.last_fetched,
        f.owner_id, f.category_id,
        COUNT(CASE WHEN a.read = 0 THEN 1 END) as unread_count
    FROM feeds f
    LEFT JOIN articles a ON f.id = a.feed_id
"#;

impl Database {
    // ========================================================================
    // Feed Registration & Lookup
    // ========================================================================

    /// Register a feed for a user, returning its ID.
    ///
    /// The title is initialised to the URL; the first successful crawl
    /// replaces it with the source's own title unless the user renames the
    /// feed first.
    ///
    /// The URL must be an absolute http(s) URL. The crawl worker relies on
    /// this: it hands stored URLs to the fetcher without re-validating.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` for a malformed or non-http URL,
    /// `StorageError::DuplicateFeed` if the (url, owner) pair is already
    /// registered.
    pub async fn insert_feed(
        &self,
        url: &str,
        owner_id: i64,
        category_id: Option<i64>,
    ) -> Result<i64, StorageError> {
        let parsed =
            url::Url::parse(url).map_err(|_| StorageError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StorageError::InvalidUrl(url.to_string()));
        }

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO feeds (url, title, owner_id, category_id) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(url)
        .bind(url)
        .bind(owner_id)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StorageError::DuplicateFeed(url.to_string())
            }
            _ => StorageError::Other(e),
        })?;

        Ok(row.0)
    }

    /// Look up a single feed by ID.
    pub async fn find_feed(&self, feed_id: i64) -> Result<Option<Feed>, StorageError> {
        let query = format!("{} WHERE f.id = ? GROUP BY f.id", FEED_SELECT);
        let row: Option<FeedRow> = sqlx::query_as(&query)
            .bind(feed_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::from_row).transpose()
    }

    /// Get one user's feeds with their unread article counts.
    pub async fn list_feeds(&self, owner_id: i64) -> Result<Vec<Feed>, StorageError> {
        let query = format!(
            "{} WHERE f.owner_id = ? GROUP BY f.id ORDER BY f.title",
            FEED_SELECT
        );
        let rows: Vec<FeedRow> = sqlx::query_as(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Feed::from_row).collect()
    }

    /// Get every registered feed across all users.
    pub async fn all_feeds(&self) -> Result<Vec<Feed>, StorageError> {
        let query = format!("{} GROUP BY f.id ORDER BY f.id", FEED_SELECT);
        let rows: Vec<FeedRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        rows.into_iter().map(Feed::from_row).collect()
    }

    /// Rename a feed. A renamed feed keeps its custom title: the title
    /// auto-adoption on crawl only fires while title still equals the URL.
    pub async fn rename_feed(&self, feed_id: i64, title: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE feeds SET title = ? WHERE id = ?")
            .bind(title)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Pause or resume a feed. User-controlled edge: the crawl worker never
    /// touches the paused state.
    pub async fn set_feed_paused(&self, feed_id: i64, paused: bool) -> Result<(), StorageError> {
        let status = if paused {
            FeedStatus::Paused
        } else {
            FeedStatus::Active
        };
        sqlx::query("UPDATE feeds SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a feed. Articles cascade via the foreign key. Returns the
    /// number of articles removed; deleting an unknown feed is a no-op.
    pub async fn delete_feed(&self, feed_id: i64) -> Result<usize, StorageError> {
        let mut tx = self.pool.begin().await?;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(feed_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Ok(0);
        }
        Ok(count.0 as usize)
    }

    // ========================================================================
    // Crawl Health Transitions
    // ========================================================================

    /// Record a failed crawl: status becomes `error` with the captured
    /// message. `last_fetched` is left unchanged: a failed attempt is not a
    /// successful fetch. A paused feed keeps its paused status (pausing is a
    /// user decision this layer never overrides), but the error message is
    /// still recorded.
    pub async fn mark_crawl_failure(
        &self,
        feed_id: i64,
        error: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET status = CASE WHEN status = 'paused' THEN status ELSE 'error' END,
                last_error = ?
            WHERE id = ?
        "#,
        )
        .bind(error)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Commit a successful crawl atomically: insert the staged articles,
    /// clear the error state, and stamp `last_fetched`. Either all staged
    /// articles plus the health update land, or none do.
    ///
    /// Inserts use `INSERT OR IGNORE` against the (feed_id, guid) uniqueness
    /// constraint, so an article a concurrent crawl already inserted is a
    /// benign no-op rather than a failure.
    ///
    /// The feed title is replaced with `source_title` only while the stored
    /// title still equals the URL (never customized). A paused feed keeps
    /// its paused status.
    ///
    /// # Returns
    ///
    /// The number of newly inserted articles.
    pub async fn commit_crawl(
        &self,
        feed_id: i64,
        source_title: Option<&str>,
        articles: &[NewArticle],
    ) -> Result<usize, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        // Batch size of 50 keeps us well under SQLite's 999 parameter limit
        // (10 columns * 50 = 500).
        const BATCH_SIZE: usize = 50;
        let mut inserted: usize = 0;

        for chunk in articles.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO articles \
                 (feed_id, guid, title, url, summary, content, author, image_url, published, created_at) ",
            );

            builder.push_values(chunk, |mut b, article| {
                b.push_bind(feed_id)
                    .push_bind(&article.guid)
                    .push_bind(&article.title)
                    .push_bind(&article.url)
                    .push_bind(&article.summary)
                    .push_bind(&article.content)
                    .push_bind(&article.author)
                    .push_bind(&article.image_url)
                    .push_bind(article.published)
                    .push_bind(now);
            });

            builder.build().execute(&mut *tx).await?;

            // changes() counts the rows the INSERT actually landed, without
            // a before/after table scan
            let changes: (i64,) = sqlx::query_as("SELECT changes()")
                .fetch_one(&mut *tx)
                .await?;
            inserted += changes.0 as usize;
        }

        // Health transition. Title adoption is decided inside the same
        // transaction so a concurrent rename cannot slip between read and
        // write.
        let current: Option<(String, String)> =
            sqlx::query_as("SELECT title, url FROM feeds WHERE id = ?")
                .bind(feed_id)
                .fetch_optional(&mut *tx)
                .await?;

        let adopt = match (&current, source_title) {
            (Some((title, url)), Some(source)) => title == url && !source.trim().is_empty(),
            _ => false,
        };

        if adopt {
            sqlx::query(
                r#"
                UPDATE feeds
                SET status = CASE WHEN status = 'paused' THEN status ELSE 'active' END,
                    last_error = NULL,
                    last_fetched = ?,
                    title = ?
                WHERE id = ?
            "#,
            )
            .bind(now)
            .bind(source_title)
            .bind(feed_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE feeds
                SET status = CASE WHEN status = 'paused' THEN status ELSE 'active' END,
                    last_error = NULL,
                    last_fetched = ?
                WHERE id = ?
            "#,
            )
            .bind(now)
            .bind(feed_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(inserted)
    }
}
