use uuid::Uuid;

use super::schema::Database;
use super::types::{DatabaseError, Feed, FeedWithOwner};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed owned by `user_id`. Fails with a unique violation if the
    /// URL is already registered.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> Result<Feed, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, created_at, updated_at, name, url, user_id, last_fetched_at
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    /// All feeds with the name of the user who added them, oldest first
    pub async fn get_feeds_with_owners(&self) -> Result<Vec<FeedWithOwner>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedWithOwner>(
            r#"
            SELECT f.id, f.name, f.url, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at ASC, f.name ASC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Look up a feed by exact URL, falling back to name.
    ///
    /// Names are not unique; when several feeds share a name the oldest wins.
    pub async fn find_feed(&self, name_or_url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
            FROM feeds
            WHERE url = ?1 OR name = ?1
            ORDER BY (url = ?1) DESC, created_at ASC
            LIMIT 1
        "#,
        )
        .bind(name_or_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// The feed that has waited longest for a poll.
    ///
    /// Never-fetched feeds (`last_fetched_at IS NULL`) come first; ties are
    /// broken by creation order.
    pub async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, rowid ASC
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Stamp a feed as polled at `fetched_at` (Unix milliseconds).
    ///
    /// The stored stamp is bumped past every other feed's, so two polls within
    /// the same millisecond still queue in the order they happened.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        fetched_at: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = MAX(?, (SELECT COALESCE(MAX(last_fetched_at), 0) + 1 FROM feeds)),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fetched_at)
        .bind(fetched_at.div_euclid(1000))
        .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
