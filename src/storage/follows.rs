use uuid::Uuid;

use super::schema::Database;
use super::types::{DatabaseError, FeedFollow, FollowedFeed};

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Insert a follow of `feed_id` by `user_id` and return it joined with
    /// the feed and user names.
    ///
    /// No existence check happens here; a second follow of the same pair is
    /// rejected by the `UNIQUE(user_id, feed_id)` constraint. Callers that
    /// need a friendly conflict error check [`Database::get_feed_follow`] first.
    pub async fn create_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<FollowedFeed, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let follow_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(follow_id)
        .bind(now)
        .bind(now)
        .bind(user_id)
        .bind(feed_id)
        .execute(&mut *tx)
        .await?;

        let followed = sqlx::query_as::<_, FollowedFeed>(
            r#"
            SELECT ff.id AS follow_id, f.id AS feed_id, f.name AS feed_name, u.name AS user_name
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.id = ?
        "#,
        )
        .bind(follow_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(followed)
    }

    pub async fn get_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<Option<FeedFollow>, DatabaseError> {
        let follow = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT id, created_at, updated_at, user_id, feed_id
            FROM feed_follows
            WHERE user_id = ? AND feed_id = ?
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(follow)
    }

    /// Feeds followed by `user_id`, in the order they were followed
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FollowedFeed>, DatabaseError> {
        let follows = sqlx::query_as::<_, FollowedFeed>(
            r#"
            SELECT ff.id AS follow_id, f.id AS feed_id, f.name AS feed_name, u.name AS user_name
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at ASC, f.name ASC
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Remove a follow. Returns the number of rows deleted (0 or 1).
    pub async fn delete_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
