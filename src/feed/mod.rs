//! Feed polling and ingestion.
//!
//! - [`client`] - HTTP fetch + RSS decode behind the [`FeedSource`] trait
//! - [`document`] - The decoded RSS document model
//! - [`dates`] - Ordered publish-date layouts
//! - [`ingest`] - One item in, one deduplicated post out
//! - [`scheduler`] - The tick loop that picks the stalest feed and drives ingestion
//!
//! # Example
//!
//! ```ignore
//! use gator::feed::{FeedScheduler, HttpFeedClient};
//!
//! let scheduler = FeedScheduler::new(db, HttpFeedClient::new()?);
//! scheduler
//!     .run_forever(Duration::from_secs(60), async { let _ = tokio::signal::ctrl_c().await; })
//!     .await;
//! ```

pub mod client;
pub mod dates;
pub mod document;
pub mod ingest;
pub mod scheduler;

pub use client::{FeedSource, FetchError, HttpFeedClient};
pub use dates::{parse_published, DateLayout, DEFAULT_LAYOUTS};
pub use document::{parse_document, FeedChannel, FeedDocument, FeedItem};
pub use ingest::{IngestError, IngestOutcome, PostIngestor};
pub use scheduler::{FeedScheduler, ScrapeError, ScrapeReport};
