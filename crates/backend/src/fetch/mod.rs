//! Remote list fetching.
//!
//! [`ListFetcher`] is the seam between the sync actor and the network. The
//! HTTP implementation streams large bodies; fetchers without a streaming
//! reader get a full-body fallback from the trait's default methods.

mod http;
pub mod lines;

use bytes::Bytes;
use futures::{
  StreamExt,
  stream::{self, BoxStream},
};
pub use http::HttpFetcher;
use lines::LineSplitter;

/// Raw response body chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Entries completed by each network chunk, in order
pub type EntryBatches = BoxStream<'static, Result<Vec<String>, FetchError>>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error("GET {url} returned HTTP {status}")]
  Status { url: String, status: u16 },
  #[error("Request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("Malformed list body: {0}")]
  Decode(String),
  #[error("Empty checksum from {url}")]
  EmptyChecksum { url: String },
}

impl FetchError {
  /// HTTP status for non-success responses
  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

#[async_trait::async_trait]
pub trait ListFetcher: Send + Sync {
  /// Fetch a whole response body as text.
  async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

  /// Fetch the remote checksum token (whitespace trimmed).
  async fn fetch_checksum(&self, url: &str) -> Result<String, FetchError> {
    let body = self.fetch_text(url).await?;
    let checksum = body.trim();
    if checksum.is_empty() {
      return Err(FetchError::EmptyChecksum { url: url.to_string() });
    }
    Ok(checksum.to_string())
  }

  /// Fetch a small or medium list fully in memory.
  async fn fetch_lines(&self, url: &str) -> Result<Vec<String>, FetchError> {
    Ok(lines::parse_lines(&self.fetch_text(url).await?))
  }

  /// Fetch a list as a byte stream.
  ///
  /// Without a streaming reader the whole body is fetched and delivered as a
  /// single chunk.
  async fn fetch_stream(&self, url: &str) -> Result<ByteStream, FetchError> {
    let body = self.fetch_text(url).await?;
    Ok(stream::once(async move { Ok(Bytes::from(body)) }).boxed())
  }
}

/// Parse a byte stream into batches of entries.
///
/// Yields to the runtime after each network chunk (not after each line) so
/// long lists don't starve other tasks. The stream ends after the first error.
pub fn entry_batches(bytes: ByteStream) -> EntryBatches {
  stream::unfold(Some((bytes, LineSplitter::new())), |state| async move {
    let (mut bytes, mut splitter) = state?;
    match bytes.next().await {
      Some(Ok(chunk)) => {
        let parsed = splitter.push(&chunk);
        tokio::task::yield_now().await;
        let next = parsed.is_ok().then_some((bytes, splitter));
        Some((parsed, next))
      }
      Some(Err(e)) => Some((Err(e), None)),
      None => match splitter.finish() {
        Ok(Some(last)) => Some((Ok(vec![last]), None)),
        Ok(None) => None,
        Err(e) => Some((Err(e), None)),
      },
    }
  })
  .boxed()
}
