//! HTTP implementation of [`AssistantClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

use super::{AssistantClient, Reply};
use crate::core::error::{ChatError, Result};
use crate::core::request::Payload;

/// Service address used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Posts JSON payloads to `{base_url}/assistant` or `{base_url}/chat`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client for `base_url`.
    ///
    /// Without a `timeout` the transport default applies.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is empty or the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ChatError::Transport("service base URL is empty".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, payload: &Payload) -> String {
        format!("{}{}", self.base_url, payload.endpoint())
    }
}

#[async_trait]
impl AssistantClient for HttpClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, payload: &Payload) -> Result<Reply> {
        let url = self.url(payload);
        tracing::debug!(url = %url, mode = %payload.mode(), "sending request");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, status = status.as_u16(), "failed to read error body");
                    String::new()
                }
            };
            return Err(ChatError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ChatError::Parse(e.to_string()))
    }
}
