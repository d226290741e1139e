use thiserror::Error;
use uuid::Uuid;

use super::dates::{parse_published, DateLayout, DEFAULT_LAYOUTS};
use super::document::FeedItem;
use crate::storage::{Database, DatabaseError, NewPost, Post};

/// Per-item ingestion failures. None of these should stop a polling cycle.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The item's `pubDate` matched none of the accepted layouts
    #[error("unparseable publish date {date:?} on item {title:?}")]
    UnparseableDate { title: String, date: String },
    /// The store rejected the post for a reason other than a duplicate URL
    #[error("failed to save post {url:?}: {source}")]
    Database {
        url: String,
        #[source]
        source: DatabaseError,
    },
}

/// What happened to an item that ingested without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Created(Post),
    /// A post with this URL was already stored; nothing was written
    Duplicate,
}

/// Turns feed items into stored posts.
#[derive(Clone)]
pub struct PostIngestor {
    db: Database,
    layouts: Vec<DateLayout>,
}

impl PostIngestor {
    /// Ingestor using [`DEFAULT_LAYOUTS`] for publish dates.
    pub fn new(db: Database) -> Self {
        Self::with_layouts(db, DEFAULT_LAYOUTS.to_vec())
    }

    /// Ingestor trying `layouts`, in order, for publish dates.
    pub fn with_layouts(db: Database, layouts: Vec<DateLayout>) -> Self {
        Self { db, layouts }
    }

    /// Store one feed item as a post of `feed_id`.
    ///
    /// Re-ingesting a URL that is already stored is a no-op reported as
    /// [`IngestOutcome::Duplicate`]; this is what makes repeated polls of the
    /// same feed idempotent.
    pub async fn ingest(&self, item: &FeedItem, feed_id: Uuid) -> Result<IngestOutcome, IngestError> {
        let published_at = parse_published(&item.pub_date, &self.layouts).ok_or_else(|| {
            IngestError::UnparseableDate {
                title: item.title.clone(),
                date: item.pub_date.clone(),
            }
        })?;

        let post = NewPost {
            title: item.title.trim().to_string(),
            url: item.link.trim().to_string(),
            description: item.description.clone(),
            published_at: published_at.timestamp(),
            feed_id,
        };

        match self.db.create_post(&post).await {
            Ok(created) => Ok(IngestOutcome::Created(created)),
            Err(e) if e.is_unique_violation() => {
                tracing::trace!(url = %post.url, "Post already stored");
                Ok(IngestOutcome::Duplicate)
            }
            Err(source) => Err(IngestError::Database {
                url: post.url,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::dates::DateLayout;
    use crate::storage::Feed;

    async fn setup() -> (Database, Feed) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("Example", "https://example.com/rss", user.id)
            .await
            .unwrap();
        (db, feed)
    }

    fn item(link: &str, pub_date: &str) -> FeedItem {
        FeedItem {
            title: format!("Title for {link}"),
            link: link.to_string(),
            description: "<p>Body</p>".to_string(),
            pub_date: pub_date.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_post_with_parsed_date() {
        let (db, feed) = setup().await;
        let ingestor = PostIngestor::new(db.clone());

        let outcome = ingestor
            .ingest(
                &item("https://example.com/a", "Mon, 02 Jan 2006 15:04:05 -0700"),
                feed.id,
            )
            .await
            .unwrap();

        let IngestOutcome::Created(post) = outcome else {
            panic!("expected a created post, got {outcome:?}");
        };
        assert_eq!(post.url, "https://example.com/a");
        assert_eq!(post.title, "Title for https://example.com/a");
        assert_eq!(post.description, "<p>Body</p>");
        assert_eq!(post.published_at, 1136239445);
        assert_eq!(post.feed_id, feed.id);
    }

    #[tokio::test]
    async fn test_ingest_same_url_twice_is_duplicate() {
        let (db, feed) = setup().await;
        let ingestor = PostIngestor::new(db.clone());
        let it = item("https://example.com/a", "Mon, 02 Jan 2006 15:04:05 GMT");

        let first = ingestor.ingest(&it, feed.id).await.unwrap();
        assert!(matches!(first, IngestOutcome::Created(_)));

        let second = ingestor.ingest(&it, feed.id).await.unwrap();
        assert_eq!(second, IngestOutcome::Duplicate);

        assert_eq!(db.get_posts_for_feed(feed.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_unparseable_date_skips_item() {
        let (db, feed) = setup().await;
        let ingestor = PostIngestor::new(db.clone());

        let err = ingestor
            .ingest(&item("https://example.com/a", "2006-01-02"), feed.id)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnparseableDate { .. }));
        assert!(db.get_posts_for_feed(feed.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_custom_layouts() {
        let (db, feed) = setup().await;
        let ingestor = PostIngestor::with_layouts(db, vec![DateLayout::RFC822_NAMED]);

        let err = ingestor
            .ingest(
                &item("https://example.com/a", "Mon, 02 Jan 2006 15:04:05 -0700"),
                feed.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnparseableDate { .. }));

        let ok = ingestor
            .ingest(&item("https://example.com/b", "02 Jan 06 15:04 GMT"), feed.id)
            .await
            .unwrap();
        assert!(matches!(ok, IngestOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_ingest_unknown_feed_is_database_error() {
        let (db, _feed) = setup().await;
        let ingestor = PostIngestor::new(db);

        let err = ingestor
            .ingest(
                &item("https://example.com/a", "Mon, 02 Jan 2006 15:04:05 -0700"),
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Database { .. }));
    }
}
