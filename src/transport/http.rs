//! HTTP transport on top of `reqwest`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::{RawResponse, Transport, TransportError};
use crate::error::Error;
use crate::models::RequestMethod;

/// Base URL for the arXiv API
pub const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// Shared HTTP transport with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the public arXiv endpoint
    pub fn new() -> Result<Self, Error> {
        Self::with_options(DEFAULT_BASE_URL, Duration::from_secs(10), default_user_agent())
    }

    /// Create a transport with a custom endpoint, timeout, and user agent
    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into(),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub(crate) fn default_user_agent() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(
        &self,
        method: RequestMethod,
        encoded_query: &str,
    ) -> Result<RawResponse, TransportError> {
        let request = match method {
            RequestMethod::Get if encoded_query.is_empty() => self.client.get(&self.base_url),
            RequestMethod::Get => self
                .client
                .get(format!("{}?{}", self.base_url, encoded_query)),
            RequestMethod::Post => self
                .client
                .post(&self.base_url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded_query.to_string()),
        };

        let response = request
            .header(ACCEPT, "application/atom+xml")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
