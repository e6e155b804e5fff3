//! HTTP client for the Anthropic Messages API.
//!
//! A thin transport: build the request, post it, surface API errors with
//! their status. Retries are deliberately absent — a failed split leaves
//! the manifest untouched, so the next pipeline run reattempts the file.

use std::time::Duration;

use tracing::debug;

use super::message::{MessagesRequest, MessagesResponse};
use crate::error::SplitError;

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client.
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    /// Creates a client with the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Api`] when the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SplitError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeout)
    }

    /// Creates a client against a custom endpoint (proxies, test servers).
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Api`] when the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SplitError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| SplitError::Api {
                message: err.to_string(),
                status: None,
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Executes one Messages API request.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Api`] on transport failures and non-success
    /// statuses (with the API's error body in the message).
    pub async fn messages(
        &self,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, SplitError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| SplitError::Api {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SplitError::Api {
                message: body,
                status: Some(status.as_u16()),
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|err| SplitError::Api {
                message: format!("failed to decode response: {err}"),
                status: Some(status.as_u16()),
            })?;
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            cache_read = parsed.usage.cache_read_input_tokens,
            "messages call complete"
        );
        Ok(parsed)
    }
}
