use crate::error::ConformanceError;
use futures::TryStreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Header carrying the validator's version text on schema requests
pub const VERSION_HEADER: &str = "X-Validator-Version";

/// Upper bound on a version endpoint response body
const MAX_TEXT_BYTES: usize = 64 * 1024;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
    /// Log connection-level activity (TLS handshake, raw I/O) at trace level
    pub connection_verbose: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("xml-conformance/{}", env!("CARGO_PKG_VERSION")),
            connection_verbose: false,
        }
    }
}

impl HttpClientConfig {
    /// Single-shot configuration for the advisory version check.
    ///
    /// The release server rejects default client identities, so the caller
    /// supplies a browser-like user agent.
    pub fn advisory(timeout_seconds: u64, user_agent: impl Into<String>) -> Self {
        Self {
            timeout_seconds,
            retry_attempts: 0,
            user_agent: user_agent.into(),
            ..Default::default()
        }
    }
}

/// Async HTTP client for the version endpoint and remote schemas
pub struct AsyncHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl AsyncHttpClient {
    /// Create a new async HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, ConformanceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .connection_verbose(config.connection_verbose)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(ConformanceError::from)?;

        Ok(Self { client, config })
    }

    /// Fetch a small text document, reading at most 64 KiB of the body
    pub async fn fetch_text(&self, url: &str) -> Result<String, ConformanceError> {
        let response = self.get_response_with_retry(url, None).await?;

        let mut buffer = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = TryStreamExt::try_next(&mut stream)
            .await
            .map_err(ConformanceError::from)?
        {
            buffer.extend_from_slice(&chunk);
            if buffer.len() >= MAX_TEXT_BYTES {
                buffer.truncate(MAX_TEXT_BYTES);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Download a schema, tagging the request with the validator version
    pub async fn download_schema(
        &self,
        url: &str,
        version_info: Option<&str>,
    ) -> Result<Vec<u8>, ConformanceError> {
        let response = self.get_response_with_retry(url, version_info).await?;
        let bytes = response.bytes().await.map_err(ConformanceError::from)?;
        Ok(bytes.to_vec())
    }

    /// Get response with retry logic
    async fn get_response_with_retry(
        &self,
        url: &str,
        version_info: Option<&str>,
    ) -> Result<Response, ConformanceError> {
        let mut current_attempt = 0;

        loop {
            match self.make_request(url, version_info).await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    let error = ConformanceError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                        message: format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown")
                        ),
                    };

                    // Retry on server errors (5xx) but not client errors (4xx)
                    if status.is_server_error() && current_attempt < self.config.retry_attempts {
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }

                    return Err(error);
                }
                Err(error) => {
                    if current_attempt < self.config.retry_attempts
                        && self.is_retryable_error(&error)
                    {
                        tracing::debug!(url, attempt = current_attempt, "Retrying: {}", error);
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Make a single HTTP request with timeout
    async fn make_request(
        &self,
        url: &str,
        version_info: Option<&str>,
    ) -> Result<Response, ConformanceError> {
        let mut request = self.client.get(url);
        if let Some(version) = version_info {
            request = request.header(VERSION_HEADER, version.trim());
        }

        timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request.send(),
        )
        .await
        .map_err(|_| ConformanceError::Timeout {
            url: url.to_string(),
            timeout_seconds: self.config.timeout_seconds,
        })?
        .map_err(ConformanceError::from)
    }

    /// Wait before retry with exponential backoff
    async fn wait_before_retry(&self, attempt: u32) {
        let delay_ms = self.config.retry_delay_ms * 2_u64.pow(attempt);
        let capped_delay = delay_ms.min(self.config.max_retry_delay_ms);
        sleep(Duration::from_millis(capped_delay)).await;
    }

    /// Check if an error is retryable
    fn is_retryable_error(&self, error: &ConformanceError) -> bool {
        match error {
            ConformanceError::Http(reqwest_error) => {
                reqwest_error.is_timeout() || reqwest_error.is_connect()
            }
            ConformanceError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
