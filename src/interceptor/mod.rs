//! Composable middleware around the core search call.
//!
//! An [`Interceptor`] receives the search parameters and a [`Next`]
//! continuation representing the rest of the pipeline: every inner
//! interceptor followed by the retry-governed transport call. It may rewrite
//! the parameters before calling `next`, return a page without calling it at
//! all, post-process what `next` returns, or fail with its own error.
//!
//! Interceptors run in registration order: the first registered is the
//! outermost, so it observes the call first and the result last. The whole
//! chain runs exactly once per logical search, however many physical attempts
//! happen inside it.
//!
//! ```rust
//! use arxiv_search::interceptor::{Interceptor, Next};
//! use arxiv_search::{Page, Result, SearchParams};
//! use async_trait::async_trait;
//!
//! /// Caps every request at 50 results
//! struct PageSizeCap;
//!
//! #[async_trait]
//! impl Interceptor for PageSizeCap {
//!     async fn intercept(&self, mut params: SearchParams, next: Next<'_>) -> Result<Page> {
//!         params.max_results = params.max_results.min(50);
//!         next.run(params).await
//!     }
//! }
//! ```

mod cache;
mod hooks;
mod logging;

pub use cache::CacheInterceptor;
pub use hooks::{HooksInterceptor, RequestHook, ResponseHook};
pub use logging::LoggingInterceptor;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::Engine;
use crate::error::Result;
use crate::models::{Page, SearchParams};

/// Middleware wrapped around every logical search
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, params: SearchParams, next: Next<'_>) -> Result<Page>;
}

/// Continuation for the remainder of the pipeline
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    engine: &'a Engine,
    cancel: &'a CancellationToken,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        interceptors: &'a [Arc<dyn Interceptor>],
        engine: &'a Engine,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            interceptors,
            engine,
            cancel,
        }
    }

    /// Run the inner interceptors and, after them, the transport call
    pub async fn run(self, params: SearchParams) -> Result<Page> {
        match self.interceptors.split_first() {
            Some((outer, rest)) => {
                let next = Next {
                    interceptors: rest,
                    ..self
                };
                outer.intercept(params, next).await
            }
            None => self.engine.execute(params, self.cancel).await,
        }
    }

    /// Cancellation token of the current search
    pub fn cancellation(&self) -> &CancellationToken {
        self.cancel
    }

    /// Number of interceptors still to run
    pub fn remaining(&self) -> usize {
        self.interceptors.len()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::error::Error;
    use crate::transport::MockTransport;
    use std::sync::Mutex;

    const EMPTY_FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
        <totalResults>0</totalResults><startIndex>0</startIndex><itemsPerPage>0</itemsPerPage>
    </feed>"#;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        async fn intercept(&self, params: SearchParams, next: Next<'_>) -> Result<Page> {
            self.log.lock().unwrap().push(format!("{}-before", self.name));
            let result = next.run(params).await;
            self.log.lock().unwrap().push(format!("{}-after", self.name));
            result
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Interceptor for ShortCircuit {
        async fn intercept(&self, params: SearchParams, _next: Next<'_>) -> Result<Page> {
            Ok(Page {
                total_results: 42,
                params,
                ..Default::default()
            })
        }
    }

    struct Reject;

    #[async_trait]
    impl Interceptor for Reject {
        async fn intercept(&self, _params: SearchParams, _next: Next<'_>) -> Result<Page> {
            Err(Error::Interceptor("blocked".to_string()))
        }
    }

    struct RewriteQuery;

    #[async_trait]
    impl Interceptor for RewriteQuery {
        async fn intercept(&self, mut params: SearchParams, next: Next<'_>) -> Result<Page> {
            params.query = "cat:cs.AI".to_string();
            next.run(params).await
        }
    }

    fn client_with(transport: Arc<MockTransport>, interceptors: Vec<Arc<dyn Interceptor>>) -> Client {
        let mut builder = Client::builder()
            .transport(transport)
            .rate_limit(std::time::Duration::ZERO);
        for interceptor in interceptors {
            builder = builder.interceptor_arc(interceptor);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_registration_order() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, EMPTY_FEED);
        let log = Arc::new(Mutex::new(Vec::new()));

        let client = client_with(
            transport.clone(),
            vec![
                Arc::new(Recorder { name: "A", log: log.clone() }),
                Arc::new(Recorder { name: "B", log: log.clone() }),
            ],
        );
        client.search(SearchParams::new("all:x")).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A-before", "B-before", "B-after", "A-after"]
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_transport() {
        let transport = Arc::new(MockTransport::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(
            transport.clone(),
            vec![
                Arc::new(ShortCircuit),
                Arc::new(Recorder { name: "inner", log: log.clone() }),
            ],
        );

        let page = client.search(SearchParams::new("all:x")).await.unwrap();
        assert_eq!(page.total_results, 42);
        assert_eq!(transport.call_count(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interceptor_error_propagates() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(transport.clone(), vec![Arc::new(Reject)]);

        let result = client.search(SearchParams::new("all:x")).await;
        assert!(matches!(result, Err(Error::Interceptor(msg)) if msg == "blocked"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_params_rewrite_reaches_transport() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, EMPTY_FEED);
        let client = client_with(transport.clone(), vec![Arc::new(RewriteQuery)]);

        let page = client.search(SearchParams::new("all:x")).await.unwrap();
        assert_eq!(page.params.query, "cat:cs.AI");
        assert_eq!(transport.calls()[0].1, "search_query=cat%3Acs.AI");
    }

    #[tokio::test]
    async fn test_chain_runs_once_across_retries() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(503, "").push_response(503, "");
        transport.always_respond(200, EMPTY_FEED);
        let log = Arc::new(Mutex::new(Vec::new()));

        let client = Client::builder()
            .transport(transport.clone())
            .rate_limit(std::time::Duration::ZERO)
            .retry(
                crate::utils::RetryPolicy::new(3)
                    .initial_interval(std::time::Duration::from_millis(1))
                    .max_interval(std::time::Duration::from_millis(2)),
            )
            .interceptor(Recorder { name: "count", log: log.clone() })
            .build()
            .unwrap();

        client.search(SearchParams::new("all:x")).await.unwrap();
        assert_eq!(transport.call_count(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["count-before", "count-after"]);
    }
}
