//! Instrumentation hooks around each search.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Interceptor, Next};
use crate::error::{Error, Result};
use crate::models::{Page, SearchParams};

/// Observes the parameters before a search is sent
pub type RequestHook = Arc<dyn Fn(&SearchParams) + Send + Sync>;

/// Observes the outcome of a search and how long it took
pub type ResponseHook = Arc<dyn Fn(&SearchParams, std::result::Result<&Page, &Error>, Duration) + Send + Sync>;

/// Calls user hooks before and after every search.
///
/// The response hook runs on failures too, with the error in place of the page.
#[derive(Clone, Default)]
pub struct HooksInterceptor {
    on_request: Option<RequestHook>,
    on_response: Option<ResponseHook>,
}

impl HooksInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SearchParams) + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(hook));
        self
    }

    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SearchParams, std::result::Result<&Page, &Error>, Duration) + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for HooksInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HooksInterceptor")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .finish()
    }
}

#[async_trait]
impl Interceptor for HooksInterceptor {
    async fn intercept(&self, params: SearchParams, next: Next<'_>) -> Result<Page> {
        if let Some(hook) = &self.on_request {
            hook(&params);
        }

        let observed = self.on_response.as_ref().map(|_| params.clone());
        let started = Instant::now();
        let result = next.run(params).await;

        if let (Some(hook), Some(params)) = (&self.on_response, observed) {
            hook(&params, result.as_ref(), started.elapsed());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::transport::MockTransport;
    use std::sync::Mutex;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
        <totalResults>7</totalResults><startIndex>0</startIndex><itemsPerPage>5</itemsPerPage>
    </feed>"#;

    #[tokio::test]
    async fn test_hooks_observe_request_and_response() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);

        let seen_query = Arc::new(Mutex::new(None));
        let seen_total = Arc::new(Mutex::new(None));
        let hooks = {
            let seen_query = seen_query.clone();
            let seen_total = seen_total.clone();
            HooksInterceptor::new()
                .on_request(move |p| *seen_query.lock().unwrap() = Some(p.query.clone()))
                .on_response(move |_, result, _| {
                    *seen_total.lock().unwrap() = result.ok().map(|page| page.total_results);
                })
        };

        let client = Client::builder()
            .transport(transport)
            .rate_limit(Duration::ZERO)
            .interceptor(hooks)
            .build()
            .unwrap();
        client
            .search(SearchParams::new("all:test").max_results(5))
            .await
            .unwrap();

        assert_eq!(seen_query.lock().unwrap().as_deref(), Some("all:test"));
        assert_eq!(*seen_total.lock().unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_response_hook_sees_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(500, "oops");

        let saw_error = Arc::new(Mutex::new(false));
        let hooks = {
            let saw_error = saw_error.clone();
            HooksInterceptor::new().on_response(move |_, result, _| {
                *saw_error.lock().unwrap() = result.is_err();
            })
        };

        let client = Client::builder()
            .transport(transport)
            .rate_limit(Duration::ZERO)
            .interceptor(hooks)
            .build()
            .unwrap();
        assert!(client.search(SearchParams::new("all:test")).await.is_err());
        assert!(*saw_error.lock().unwrap());
    }
}
