//! Structured logging of each logical search.

use async_trait::async_trait;
use std::time::Instant;

use super::{Interceptor, Next};
use crate::error::Result;
use crate::models::{Page, SearchParams};

/// Logs the query, cursor, outcome and duration of every search
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, params: SearchParams, next: Next<'_>) -> Result<Page> {
        let query = params.query.clone();
        let start = params.start;
        let started = Instant::now();

        tracing::debug!(
            query = %query,
            start,
            max_results = params.max_results,
            "Search started"
        );

        let result = next.run(params).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(page) => tracing::info!(
                query = %query,
                start,
                entries = page.len(),
                total_results = page.total_results,
                elapsed_ms,
                "Search completed"
            ),
            Err(e) => tracing::warn!(
                query = %query,
                start,
                elapsed_ms,
                "Search failed: {}",
                e
            ),
        }

        result
    }
}
