use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, warn};

use super::{ByteStream, FetchError, ListFetcher};

/// reqwest-backed fetcher with a streaming body reader.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  /// Per-request timeout; `None` leaves it to the network layer
  timeout: Option<Duration>,
}

impl HttpFetcher {
  pub fn new(timeout: Option<Duration>) -> Self {
    Self {
      client: reqwest::Client::new(),
      timeout,
    }
  }

  async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
    let mut request = self.client.get(url);
    if let Some(timeout) = self.timeout {
      request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      warn!(url, status = status.as_u16(), "List request failed");
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }

    debug!(url, content_length = ?response.content_length(), "List response received");
    Ok(response)
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self::new(None)
  }
}

#[async_trait]
impl ListFetcher for HttpFetcher {
  #[tracing::instrument(level = "trace", skip(self))]
  async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
    Ok(self.get(url).await?.text().await?)
  }

  #[tracing::instrument(level = "trace", skip(self))]
  async fn fetch_stream(&self, url: &str) -> Result<ByteStream, FetchError> {
    let response = self.get(url).await?;
    Ok(response.bytes_stream().map_err(FetchError::from).boxed())
  }
}
