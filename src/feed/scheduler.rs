use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use super::client::{FeedSource, FetchError};
use super::ingest::{IngestOutcome, PostIngestor};
use crate::storage::{Database, DatabaseError, Feed};

/// Errors that end one polling cycle early. The loop itself keeps going.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("couldn't fetch feed {feed}: {source}")]
    Fetch {
        feed: String,
        #[source]
        source: FetchError,
    },
}

/// Tally of one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub feed_name: String,
    /// Items in the fetched document
    pub items: usize,
    pub created: usize,
    pub duplicates: usize,
    /// Items that failed to ingest (bad date, store error)
    pub skipped: usize,
}

/// Polls one feed per tick, stalest first.
pub struct FeedScheduler<S> {
    db: Database,
    source: S,
    ingestor: PostIngestor,
}

impl<S: FeedSource> FeedScheduler<S> {
    pub fn new(db: Database, source: S) -> Self {
        let ingestor = PostIngestor::new(db.clone());
        Self::with_ingestor(db, source, ingestor)
    }

    pub fn with_ingestor(db: Database, source: S, ingestor: PostIngestor) -> Self {
        Self {
            db,
            source,
            ingestor,
        }
    }

    /// Run a polling cycle every `interval` until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. Cycles never overlap: a cycle that
    /// overruns the interval is followed by exactly one immediate tick. The
    /// shutdown future is only polled between cycles, so a cycle in progress
    /// always completes.
    pub async fn run_forever<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping feed collection");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.scrape_next().await {
                Ok(Some(report)) => {
                    tracing::info!(
                        feed = %report.feed_name,
                        items = report.items,
                        created = report.created,
                        duplicates = report.duplicates,
                        skipped = report.skipped,
                        "Feed collected"
                    );
                }
                Ok(None) => {
                    tracing::info!("No feeds to fetch, waiting for the next tick");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling cycle failed");
                }
            }
        }
    }

    /// Run one polling cycle against the stalest feed.
    ///
    /// Returns `Ok(None)` when there are no feeds at all.
    pub async fn scrape_next(&self) -> Result<Option<ScrapeReport>, ScrapeError> {
        let Some(feed) = self.db.get_next_feed_to_fetch().await? else {
            return Ok(None);
        };
        tracing::debug!(feed = %feed.name, url = %feed.url, "Found a feed to fetch");
        self.scrape_feed(&feed).await.map(Some)
    }

    /// Mark `feed` fetched, download it, and ingest every item in order.
    ///
    /// The feed is marked before the download so that a failing feed moves to
    /// the back of the queue instead of being retried on the next tick.
    pub async fn scrape_feed(&self, feed: &Feed) -> Result<ScrapeReport, ScrapeError> {
        self.db
            .mark_feed_fetched(feed.id, chrono::Utc::now().timestamp_millis())
            .await?;

        let document = self
            .source
            .fetch(&feed.url)
            .await
            .map_err(|source| ScrapeError::Fetch {
                feed: feed.name.clone(),
                source,
            })?;

        let mut report = ScrapeReport {
            feed_name: feed.name.clone(),
            items: document.channel.items.len(),
            ..ScrapeReport::default()
        };

        for item in &document.channel.items {
            match self.ingestor.ingest(item, feed.id).await {
                Ok(IngestOutcome::Created(post)) => {
                    tracing::debug!(feed = %feed.name, title = %post.title, "Saved post");
                    report.created += 1;
                }
                Ok(IngestOutcome::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    tracing::warn!(feed = %feed.name, error = %e, "Skipping item");
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedChannel, FeedDocument, FeedItem};

    /// Serves the same document for every URL.
    struct Fixed(FeedDocument);

    impl FeedSource for Fixed {
        async fn fetch(&self, _url: &str) -> Result<FeedDocument, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn item(link: &str) -> FeedItem {
        FeedItem {
            title: format!("Title for {link}"),
            link: link.to_string(),
            description: String::new(),
            pub_date: "Mon, 02 Jan 2006 15:04:05 GMT".to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_error_skips_only_that_item() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("Example", "https://example.com/rss", user.id)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_broken BEFORE INSERT ON posts
             WHEN NEW.url LIKE '%/broken'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let document = FeedDocument {
            channel: FeedChannel {
                items: vec![
                    item("https://example.com/1"),
                    item("https://example.com/broken"),
                    item("https://example.com/3"),
                ],
                ..FeedChannel::default()
            },
        };
        let scheduler = FeedScheduler::new(db.clone(), Fixed(document));

        let report = scheduler.scrape_feed(&feed).await.unwrap();
        assert_eq!(report.items, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.duplicates, 0);

        let mut urls: Vec<_> = db
            .get_posts_for_feed(feed.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        urls.sort();
        assert_eq!(urls, ["https://example.com/1", "https://example.com/3"]);
    }
}
