use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::utils::validation::MAX_METADATA_BYTES;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("tool-shelf/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("Transfer from {url} interrupted: {message}")]
    Interrupted { url: String, message: String },
}

/// Network access used by the update checker.
///
/// Implementations perform plain GET requests; timeouts and cancellation
/// are applied by the caller around each await.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a whole response body
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// Start a GET and hand back the body as a stream of chunks
    async fn stream(&self, url: &str) -> Result<Box<dyn ByteStream>, TransportError>;
}

/// Response body read chunk by chunk
#[async_trait]
pub trait ByteStream: Send {
    /// Length announced by the server, if any
    fn content_length(&self) -> Option<u64>;

    /// Next chunk of the body, `None` once it is complete
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// [`Transport`] over HTTP(S) with reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    connect_timeout: Duration,
    max_body: usize,
}

impl HttpTransport {
    /// Client honoring the proxy settings of the environment
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Client` if the TLS backend cannot be set up.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        Self::build(connect_timeout, true)
    }

    /// Client that always connects directly
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Client` if the TLS backend cannot be set up.
    pub fn direct(connect_timeout: Duration) -> Result<Self, TransportError> {
        Self::build(connect_timeout, false)
    }

    fn build(connect_timeout: Duration, system_proxy: bool) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout);
        if !system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(TransportError::Client)?;
        Ok(Self {
            client,
            connect_timeout,
            max_body: MAX_METADATA_BYTES,
        })
    }

    /// Cap on bodies read whole by [`Transport::get`]
    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.max_body = limit;
        self
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> TransportError {
        if source.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                after: self.connect_timeout,
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                source,
            }
        }
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut response = self.send(url).await?;
        let too_large = || TransportError::TooLarge {
            url: url.to_string(),
            limit: self.max_body,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.request_error(url, e))?
        {
            if body.len() + chunk.len() > self.max_body {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    async fn stream(&self, url: &str) -> Result<Box<dyn ByteStream>, TransportError> {
        let response = self.send(url).await?;
        Ok(Box::new(HttpStream {
            url: url.to_string(),
            response,
        }))
    }
}

struct HttpStream {
    url: String,
    response: reqwest::Response,
}

#[async_trait]
impl ByteStream for HttpStream {
    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let chunk = self
            .response
            .chunk()
            .await
            .map_err(|e| TransportError::Interrupted {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}
