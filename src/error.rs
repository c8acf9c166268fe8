//! Error types for the search pipeline.

use crate::query::ParseError;

/// Errors that can occur while building, sending, or decoding a search.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Search parameters violate protocol-documented bounds
    #[error("Invalid search parameters: {0}")]
    Validation(String),

    /// Wire-grammar input could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Retryable failure (network timeout or retryable status) that outlived every attempt
    #[error("Transient transport failure after {attempts} attempt(s): {reason}")]
    Transient {
        /// HTTP status of the last response, if one was received
        status: Option<u16>,
        reason: String,
        attempts: u32,
    },

    /// Non-retryable HTTP status or non-network transport failure
    #[error("Transport failure: {reason}")]
    Terminal {
        /// HTTP status of the response, if one was received
        status: Option<u16>,
        reason: String,
    },

    /// Response body could not be mapped to a page
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Returned deliberately by an interceptor
    #[error("Interceptor error: {0}")]
    Interceptor(String),

    /// No next or previous page is available
    #[error("{0}")]
    Exhausted(&'static str),

    /// The caller's cancellation token fired
    #[error("Search cancelled")]
    Cancelled,

    /// The HTTP client could not be constructed
    #[error("Client error: {0}")]
    Client(String),
}

impl Error {
    /// HTTP status attached to a transport failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transient { status, .. } | Error::Terminal { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this error came from a transient condition that exhausted its retries
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
