use super::schema::Database;
use super::types::{Article, StorageError};

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Check whether an article with this (feed, guid) pair is already
    /// stored. This is the dedup probe the crawl worker runs per candidate.
    pub async fn article_exists(&self, feed_id: i64, guid: &str) -> Result<bool, StorageError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM articles WHERE feed_id = ? AND guid = ? LIMIT 1")
                .bind(feed_id)
                .bind(guid)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Get all articles for a feed, newest first.
    pub async fn get_articles_for_feed(&self, feed_id: i64) -> Result<Vec<Article>, StorageError> {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, feed_id, guid, title, url, summary, content, author,
                   image_url, read, published, created_at
            FROM articles
            WHERE feed_id = ?
            ORDER BY published DESC, created_at DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    /// Mark an article as read
    pub async fn mark_article_read(&self, article_id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE articles SET read = 1 WHERE id = ?")
            .bind(article_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, NewArticle};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn test_article(guid: &str, published: Option<i64>) -> NewArticle {
        NewArticle {
            guid: guid.to_string(),
            title: format!("Article {}", guid),
            url: Some(format!("https://example.com/{}", guid)),
            summary: None,
            content: None,
            author: Some("Jane Doe".to_string()),
            image_url: None,
            published,
        }
    }

    #[tokio::test]
    async fn test_article_exists() {
        let db = test_db().await;
        let feed_id = db
            .insert_feed("https://example.com/rss", 1, None)
            .await
            .unwrap();

        assert!(!db.article_exists(feed_id, "g1").await.unwrap());

        db.commit_crawl(feed_id, None, &[test_article("g1", None)])
            .await
            .unwrap();

        assert!(db.article_exists(feed_id, "g1").await.unwrap());
        assert!(!db.article_exists(feed_id, "g2").await.unwrap());
    }

    #[tokio::test]
    async fn test_guid_scoped_per_feed() {
        let db = test_db().await;
        let feed_a = db
            .insert_feed("https://a.example.com/rss", 1, None)
            .await
            .unwrap();
        let feed_b = db
            .insert_feed("https://b.example.com/rss", 1, None)
            .await
            .unwrap();

        db.commit_crawl(feed_a, None, &[test_article("shared", None)])
            .await
            .unwrap();

        // Two feeds may share a guid without colliding
        assert!(!db.article_exists(feed_b, "shared").await.unwrap());
        let count = db
            .commit_crawl(feed_b, None, &[test_article("shared", None)])
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_articles_ordered_newest_first() {
        let db = test_db().await;
        let feed_id = db
            .insert_feed("https://example.com/rss", 1, None)
            .await
            .unwrap();

        db.commit_crawl(
            feed_id,
            None,
            &[
                test_article("old", Some(1700000000)),
                test_article("new", Some(1704067200)),
                test_article("undated", None),
            ],
        )
        .await
        .unwrap();

        let articles = db.get_articles_for_feed(feed_id).await.unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].guid, "new");
        assert_eq!(articles[1].guid, "old");
        assert_eq!(articles[2].guid, "undated");
    }

    #[tokio::test]
    async fn test_articles_default_unread() {
        let db = test_db().await;
        let feed_id = db
            .insert_feed("https://example.com/rss", 1, None)
            .await
            .unwrap();
        db.commit_crawl(feed_id, None, &[test_article("g1", None)])
            .await
            .unwrap();

        let articles = db.get_articles_for_feed(feed_id).await.unwrap();
        assert!(!articles[0].read);
        assert_eq!(articles[0].author.as_deref(), Some("Jane Doe"));

        db.mark_article_read(articles[0].id).await.unwrap();

        let articles = db.get_articles_for_feed(feed_id).await.unwrap();
        assert!(articles[0].read);

        let feed = db.find_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(feed.unread_count, 0);
    }
}
