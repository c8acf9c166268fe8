//! Transport collaborators: one HTTP exchange per call.
//!
//! The search pipeline never talks to the network directly. It hands an
//! already form-encoded query to a [`Transport`] and gets back a
//! [`RawResponse`] or a [`TransportError`]. Retrying, rate limiting and
//! decoding all happen above this seam.
//!
//! - [`HttpTransport`]: `reqwest`-backed transport used by default
//! - [`MockTransport`]: scripted transport for tests

mod http;
mod mock;

pub(crate) use self::http::default_user_agent;
pub use self::http::{HttpTransport, DEFAULT_BASE_URL};
pub use mock::MockTransport;

use async_trait::async_trait;

use crate::models::RequestMethod;

/// A single HTTP exchange with the search endpoint
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Issue one request carrying `encoded_query` and return the full response
    async fn exchange(
        &self,
        method: RequestMethod,
        encoded_query: &str,
    ) -> Result<RawResponse, TransportError>;
}

/// A received HTTP response with its body read
///
/// Dropping the value releases the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `200 OK`
    pub fn is_ok(&self) -> bool {
        self.status == ::http::StatusCode::OK.as_u16()
    }
}

/// Failures below the HTTP status level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request or connection deadline elapsed
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other failure (request construction, body read, redirect loop)
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether this is a network-level failure worth retrying
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}
