//! Search client: the retry-governed engine behind the interceptor chain.
//!
//! A [`Client`] owns one [`Engine`] (transport, decoder, retry policy and
//! rate limiter) and the list of registered interceptors. Every logical
//! search validates its parameters, runs the interceptor chain once, and the
//! innermost step performs as many physical attempts as the retry policy
//! allows.
//!
//! ```rust,no_run
//! use arxiv_search::{Client, Query, SearchParams};
//!
//! # async fn run() -> arxiv_search::Result<()> {
//! let client = Client::builder().default_retry().build()?;
//! let query = Query::new().title("graph neural networks").and().category("cs.LG");
//! let page = client.search(SearchParams::new(&query).max_results(20)).await?;
//!
//! for entry in &page.entries {
//!     println!("{}: {}", entry.arxiv_id(), entry.title);
//! }
//! # Ok(())
//! # }
//! ```

mod pagination;

pub use pagination::SearchIter;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::decode::{AtomDecoder, Decoder};
use crate::error::{Error, Result};
use crate::interceptor::{Interceptor, Next};
use crate::models::{Page, RequestMethod, SearchParams};
use crate::transport::{
    default_user_agent, HttpTransport, RawResponse, Transport, TransportError, DEFAULT_BASE_URL,
};
use crate::utils::{backoff, is_retryable, RateLimiter, RetryPolicy};

/// Default HTTP timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default spacing between physical requests
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(3);

/// Innermost pipeline step: rate limiting, retries, transport and decoding
pub(crate) struct Engine {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn Decoder>,
    method: RequestMethod,
    retry: Option<RetryPolicy>,
    rate_limiter: Option<RateLimiter>,
}

impl Engine {
    /// Fetch and decode one page
    pub(crate) async fn execute(
        &self,
        params: SearchParams,
        cancel: &CancellationToken,
    ) -> Result<Page> {
        let response = self.raw_search(&params, cancel).await?;
        let mut page = self.decoder.decode(&response)?;
        page.params = params;
        Ok(page)
    }

    /// Run the retry loop and return the first `200 OK` response
    pub(crate) async fn raw_search(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        params.validate()?;

        let max_attempts = self.retry.map_or(1, |p| p.max_attempts.max(1));
        let encoded = params.encode();
        let mut attempt = 1;

        loop {
            match &self.rate_limiter {
                Some(limiter) => limiter.acquire(cancel).await?,
                None if cancel.is_cancelled() => return Err(Error::Cancelled),
                None => {}
            }

            tracing::debug!(
                attempt,
                max_attempts,
                method = %self.method,
                "Sending search request"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = self.transport.exchange(self.method, &encoded) => outcome,
            };

            let outcome = match outcome {
                Ok(response) if response.is_ok() => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Search succeeded after retries");
                    }
                    return Ok(response);
                }
                failed => failed,
            };

            let retryable = match &outcome {
                Ok(response) => is_retryable(None, Some(response.status)),
                Err(err) => is_retryable(Some(err), None),
            };

            if attempt < max_attempts && retryable {
                let delay = backoff(attempt, self.retry.as_ref());
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable failure: {}",
                    describe(&outcome)
                );
                // Release the failed response before waiting
                drop(outcome);

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
                continue;
            }

            if retryable {
                tracing::warn!(
                    attempts = attempt,
                    "Giving up after retries: {}",
                    describe(&outcome)
                );
            }
            return Err(into_error(outcome, retryable, attempt));
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("transport", &self.transport)
            .field("decoder", &self.decoder)
            .field("method", &self.method)
            .field("retry", &self.retry)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}

fn describe(outcome: &std::result::Result<RawResponse, TransportError>) -> String {
    match outcome {
        Ok(response) => format!("HTTP {}", response.status),
        Err(err) => err.to_string(),
    }
}

fn into_error(
    outcome: std::result::Result<RawResponse, TransportError>,
    retryable: bool,
    attempts: u32,
) -> Error {
    let reason = describe(&outcome);
    let status = outcome.ok().map(|response| response.status);
    if retryable {
        Error::Transient {
            status,
            reason,
            attempts,
        }
    } else {
        Error::Terminal { status, reason }
    }
}

struct Inner {
    engine: Engine,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

/// Handle to a configured search pipeline; cheap to clone
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("engine", &self.inner.engine)
            .field("interceptors", &self.inner.interceptors.len())
            .finish()
    }
}

impl Client {
    /// Client for the public endpoint with default options and no retries
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Build a client from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.client_builder().build()
    }

    /// Run one logical search through the interceptor chain
    pub async fn search(&self, params: SearchParams) -> Result<Page> {
        self.search_with_cancel(params, &CancellationToken::new())
            .await
    }

    /// Run one logical search, aborting when `cancel` fires.
    ///
    /// Cancellation interrupts rate-limiter waits, in-flight requests and
    /// backoff sleeps, and takes precedence over any retryable failure.
    pub async fn search_with_cancel(
        &self,
        params: SearchParams,
        cancel: &CancellationToken,
    ) -> Result<Page> {
        params.validate()?;
        Next::new(&self.inner.interceptors, &self.inner.engine, cancel)
            .run(params)
            .await
    }

    /// Retry-governed exchange without decoding or interceptors
    pub async fn raw_search(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.inner.engine.raw_search(params, cancel).await
    }

    /// Fetch the page after `page`
    pub async fn search_next(&self, page: &Page) -> Result<Page> {
        if !page.has_more() {
            return Err(Error::Exhausted("no more results"));
        }
        let params = page.params.clone().start(page.next_start());
        self.search(params).await
    }

    /// Fetch the page before `page`
    pub async fn search_previous(&self, page: &Page) -> Result<Page> {
        if !page.has_previous() {
            return Err(Error::Exhausted("no previous results"));
        }
        let params = page.params.clone().start(page.previous_start());
        self.search(params).await
    }

    /// Lazily iterate every entry of a result set, starting at `params.start`
    pub fn iter(&self, params: SearchParams) -> SearchIter {
        self.iter_with_cancel(params, CancellationToken::new())
    }

    /// Like [`Client::iter`], wired to a caller-owned cancellation token
    pub fn iter_with_cancel(&self, params: SearchParams, cancel: CancellationToken) -> SearchIter {
        SearchIter::new(self.clone(), params, cancel)
    }

    pub fn request_method(&self) -> RequestMethod {
        self.inner.engine.method
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.inner.engine.retry.as_ref()
    }

    pub fn rate_limit(&self) -> Duration {
        self.inner
            .engine
            .rate_limiter
            .as_ref()
            .map_or(Duration::ZERO, RateLimiter::interval)
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    base_url: String,
    method: RequestMethod,
    timeout: Duration,
    rate_limit: Duration,
    retry: Option<RetryPolicy>,
    user_agent: Option<String>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Option<Arc<dyn Transport>>,
    decoder: Option<Arc<dyn Decoder>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            method: RequestMethod::Get,
            timeout: DEFAULT_TIMEOUT,
            rate_limit: DEFAULT_RATE_LIMIT,
            retry: None,
            user_agent: None,
            interceptors: Vec::new(),
            transport: None,
            decoder: None,
        }
    }
}

impl ClientBuilder {
    /// Endpoint used by the default HTTP transport
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn request_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum spacing between physical requests; zero disables limiting
    pub fn rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limit = interval;
        self
    }

    /// Retry transient failures according to `policy`
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy.normalized());
        self
    }

    /// Three attempts with 1s initial backoff, 30s cap and multiplier 2
    pub fn default_retry(self) -> Self {
        self.retry(RetryPolicy::default())
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Append an interceptor; earlier registrations wrap later ones
    pub fn interceptor(self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptor_arc(Arc::new(interceptor))
    }

    /// Append a shared interceptor
    pub fn interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Replace the HTTP transport; `base_url`, `timeout` and `user_agent` are then ignored
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the Atom decoder
    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::with_options(
                self.base_url,
                self.timeout,
                self.user_agent.as_deref().unwrap_or(default_user_agent()),
            )?) as Arc<dyn Transport>,
        };
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(AtomDecoder::new()) as Arc<dyn Decoder>);

        let engine = Engine {
            transport,
            decoder,
            method: self.method,
            retry: self.retry,
            rate_limiter: RateLimiter::new(self.rate_limit),
        };

        Ok(Client {
            inner: Arc::new(Inner {
                engine,
                interceptors: self.interceptors,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::time::Instant;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"
        xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
        <opensearch:totalResults>100</opensearch:totalResults>
        <opensearch:startIndex>20</opensearch:startIndex>
        <opensearch:itemsPerPage>20</opensearch:itemsPerPage>
        <entry><id>http://arxiv.org/abs/2101.00001v1</id><title>First</title></entry>
    </feed>"#;

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts)
            .initial_interval(Duration::from_millis(1))
            .max_interval(Duration::from_millis(5))
    }

    fn client(transport: &Arc<MockTransport>, retry: Option<RetryPolicy>) -> Client {
        let mut builder = Client::builder()
            .transport(transport.clone())
            .rate_limit(Duration::ZERO);
        if let Some(policy) = retry {
            builder = builder.retry(policy);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_search_decodes_page_and_carries_params() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let client = client(&transport, None);

        let params = SearchParams::new("ti:graph").start(20).max_results(20);
        let page = client.search(params.clone()).await.unwrap();

        assert_eq!(page.total_results, 100);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.params, params);
        assert_eq!(
            transport.calls()[0],
            (
                RequestMethod::Get,
                "search_query=ti%3Agraph&start=20&max_results=20".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_retryable_status_exhausts_attempts() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(503, "unavailable");
        let client = client(&transport, Some(fast_retry(3)));

        let err = client.search(SearchParams::new("all:x")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transient { status: Some(503), attempts: 3, .. }
        ));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(400, "bad request");
        let client = client(&transport, Some(fast_retry(3)));

        let err = client.search(SearchParams::new("all:x")).await.unwrap_err();
        assert!(matches!(err, Error::Terminal { status: Some(400), .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_network_errors_retry_then_succeed() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_error(TransportError::Timeout("slow".to_string()))
            .push_error(TransportError::Connect("refused".to_string()));
        transport.always_respond(200, FEED);
        let client = client(&transport, Some(fast_retry(3)));

        assert!(client.search(SearchParams::new("all:x")).await.is_ok());
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_network_error_is_terminal() {
        let transport = Arc::new(MockTransport::new());
        transport.always_fail(TransportError::Other("bad url".to_string()));
        let client = client(&transport, Some(fast_retry(3)));

        let err = client.search(SearchParams::new("all:x")).await.unwrap_err();
        assert!(matches!(err, Error::Terminal { status: None, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_without_policy_single_attempt() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(503, "");
        let client = client(&transport, None);

        let err = client.search(SearchParams::new("all:x")).await.unwrap_err();
        assert!(matches!(err, Error::Transient { attempts: 1, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_validation_precedes_network() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let client = client(&transport, None);

        let err = client
            .search(SearchParams::new("all:x").max_results(2001))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = client
            .search(SearchParams::new("all:x").start(30001))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(503, "");
        let client = Client::builder()
            .transport(transport.clone())
            .rate_limit(Duration::ZERO)
            .retry(RetryPolicy::new(5).initial_interval(Duration::from_secs(30)))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client
            .search_with_cancel(SearchParams::new("all:x"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_during_exchange() {
        let transport = Arc::new(MockTransport::new().with_delay(Duration::from_secs(30)));
        transport.always_respond(200, FEED);
        let client = client(&transport, Some(RetryPolicy::new(3)));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client
            .search_with_cancel(SearchParams::new("all:x"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let client = client(&transport, None);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .search_with_cancel(SearchParams::new("all:x"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_spaces_retries() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(503, "");
        transport.always_respond(200, FEED);
        let client = Client::builder()
            .transport(transport.clone())
            .rate_limit(Duration::from_millis(100))
            .retry(fast_retry(2))
            .build()
            .unwrap();

        let started = Instant::now();
        client.search(SearchParams::new("all:x")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(90));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_decode_failure_is_terminal() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, "<feed><entry><title>open");
        let client = client(&transport, Some(fast_retry(3)));

        let err = client.search(SearchParams::new("all:x")).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_raw_search_returns_body() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let client = client(&transport, None);

        let response = client
            .raw_search(&SearchParams::new("all:x"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, FEED);
    }

    #[tokio::test]
    async fn test_post_method_is_forwarded() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let client = Client::builder()
            .transport(transport.clone())
            .rate_limit(Duration::ZERO)
            .request_method(RequestMethod::Post)
            .build()
            .unwrap();

        client.search(SearchParams::new("all:x")).await.unwrap();
        assert_eq!(transport.calls()[0].0, RequestMethod::Post);
    }

    #[tokio::test]
    async fn test_next_and_previous_navigation() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let client = client(&transport, None);

        let page = Page {
            total_results: 100,
            start_index: 20,
            items_per_page: 20,
            params: SearchParams::new("all:x").start(20).max_results(20),
            ..Default::default()
        };

        let next = client.search_next(&page).await.unwrap();
        assert_eq!(next.params.start, 40);
        let previous = client.search_previous(&page).await.unwrap();
        assert_eq!(previous.params.start, 0);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_navigation_exhaustion() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport, None);

        let last = Page {
            total_results: 100,
            start_index: 80,
            items_per_page: 20,
            ..Default::default()
        };
        assert!(matches!(
            client.search_next(&last).await,
            Err(Error::Exhausted("no more results"))
        ));

        let first = Page {
            total_results: 100,
            start_index: 0,
            items_per_page: 20,
            ..Default::default()
        };
        assert!(matches!(
            client.search_previous(&first).await,
            Err(Error::Exhausted("no previous results"))
        ));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder().build().unwrap();
        assert_eq!(client.request_method(), RequestMethod::Get);
        assert_eq!(client.rate_limit(), DEFAULT_RATE_LIMIT);
        assert!(client.retry_policy().is_none());

        let client = Client::builder()
            .default_retry()
            .rate_limit(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(client.retry_policy(), Some(&RetryPolicy::default()));
        assert_eq!(client.rate_limit(), Duration::ZERO);
    }

    #[test]
    fn test_retry_policy_is_normalized() {
        let client = Client::builder()
            .retry(RetryPolicy::new(0).initial_interval(Duration::ZERO))
            .build()
            .unwrap();
        let policy = client.retry_policy().unwrap();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
    }
}
