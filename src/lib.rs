//! # arXiv Search
//!
//! A resilient client for the arXiv search API.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`query`]: Query builder, wire-grammar parser and serializer
//! - [`client`]: Search client, retry-governed execution and pagination
//! - [`interceptor`]: Middleware chain wrapped around every search
//! - [`transport`]: HTTP exchange collaborators
//! - [`decode`]: Atom feed decoding
//! - [`models`]: Search parameters, entries and pages
//! - [`utils`]: Retry policy, backoff and rate limiting
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use arxiv_search::{Client, Query, SearchParams};
//!
//! # async fn run() -> arxiv_search::Result<()> {
//! let client = Client::builder().default_retry().build()?;
//! let query = Query::new().author("Hinton").and().category("cs.LG");
//!
//! let mut entries = client.iter(SearchParams::new(&query).max_results(100));
//! while let Some(entry) = entries.next().await {
//!     println!("{}", entry.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod query;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use client::{Client, ClientBuilder, SearchIter};
pub use error::{Error, Result};
pub use models::{Entry, Page, RequestMethod, SearchParams, SortBy, SortOrder};
pub use query::{ParseError, Query};
pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
