use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::document::{parse_document, FeedDocument};

/// Whole-request budget: connect, headers and body
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Feeds larger than this are refused rather than buffered
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Why a feed document could not be obtained. Never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    HttpStatus(u16),
    #[error("no complete response within {}s", FETCH_TIMEOUT.as_secs())]
    Timeout,
    #[error("feed body exceeds {} bytes", BODY_LIMIT)]
    ResponseTooLarge,
    /// The body is not an RSS document we can decode
    #[error("could not decode feed: {0}")]
    Parse(String),
}

/// Anything that can turn a feed URL into a decoded document.
///
/// The scheduler is generic over this so tests can serve canned documents.
pub trait FeedSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FeedDocument, FetchError>> + Send;
}

/// Fetches feeds over HTTP(S). One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
}

impl HttpFeedClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gator/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let sent = tokio::time::timeout(FETCH_TIMEOUT, self.client.get(url).send()).await;
        match sent {
            Err(_elapsed) => Err(FetchError::Timeout),
            Ok(Err(e)) if e.is_timeout() => Err(FetchError::Timeout),
            Ok(Err(e)) => Err(FetchError::Network(e)),
            Ok(Ok(response)) if response.status().is_success() => Ok(response),
            Ok(Ok(response)) => Err(FetchError::HttpStatus(response.status().as_u16())),
        }
    }
}

impl FeedSource for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        let response = self.get(url).await?;
        let body = collect_body(response, BODY_LIMIT).await?;
        let document = parse_document(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::debug!(
            url = %url,
            bytes = body.len(),
            items = document.channel.items.len(),
            "Fetched feed document"
        );
        Ok(document)
    }
}

/// Buffer the response body, giving up as soon as it passes `limit` bytes.
async fn collect_body(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    let declared = response.content_length().unwrap_or(0);
    if declared > limit as u64 {
        return Err(FetchError::ResponseTooLarge);
    }

    let mut body = Vec::with_capacity(declared as usize);
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
