//! Messages API client
//!
//! Sends a single user message to the upstream inference API and returns the
//! response body untouched.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::ProxyConfig;

/// API version header value expected by the Messages endpoint
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Path of the Messages endpoint, relative to the base URL
const MESSAGES_PATH: &str = "/v1/messages";

/// Errors that can occur when calling the upstream API
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Building the client or sending the request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body was not valid JSON
    #[error("failed to parse response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API key cannot be sent as a header value
    #[error("API key contains characters not allowed in a header")]
    InvalidApiKey,
}

/// Request body for the Messages endpoint
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    model: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Client for the upstream Messages API
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl UpstreamClient {
    /// Builds a client whose default headers carry the configured API key
    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        let mut api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| UpstreamError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-api-key"), api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client around an existing HTTP client
    ///
    /// The caller is responsible for any authentication headers.
    pub fn with_client(client: Client, config: &ProxyConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), MESSAGES_PATH),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Full URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `message` as the only turn of a conversation
    ///
    /// # Returns
    /// * `Ok(Value)` - The parsed response body
    /// * `Err(UpstreamError)` - On transport failure, non-2xx status or a non-JSON body
    pub async fn send(&self, message: &str) -> Result<Value, UpstreamError> {
        let body = MessagesRequest {
            messages: [ChatMessage {
                role: "user",
                content: message,
            }],
            model: &self.model,
            max_tokens: self.max_tokens,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Status { status, body: text });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
