use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Schema creation failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// True when the store rejected a write because it would duplicate a
    /// UNIQUE column (user name, feed URL, post URL, follow pair).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Other(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    /// Unix milliseconds of the last poll; `None` until the scheduler has
    /// polled the feed once
    pub last_fetched_at: Option<i64>,
}

/// Feed listing row joined with the name of the user who added it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithOwner {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub owner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_id: Uuid,
    pub feed_id: Uuid,
}

/// A follow joined with the feed and user names, as shown to the user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowedFeed {
    pub follow_id: Uuid,
    pub feed_id: Uuid,
    pub feed_name: String,
    pub user_name: String,
}

/// Insert payload for a post produced by ingestion
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: i64,
    pub feed_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: i64,
    pub feed_id: Uuid,
}

/// Post row for browsing, carrying the name of the feed it came from
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithFeed {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: i64,
    pub feed_name: String,
}
