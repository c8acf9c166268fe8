//! In-memory page cache.
//!
//! Keys are the md5 digest of the form-encoded parameters, so two searches
//! share an entry only if they would send the same query string. Nothing is
//! persisted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Interceptor, Next};
use crate::error::Result;
use crate::models::{Page, SearchParams};

/// Default number of cached pages
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct CachedPage {
    page: Page,
    expires_at: Instant,
}

/// Serves fresh pages from memory without touching the transport
#[derive(Debug)]
pub struct CacheInterceptor {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CachedPage>>,
}

impl CacheInterceptor {
    /// Cache pages for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            capacity: DEFAULT_CAPACITY,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the number of cached pages
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached page
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedPage>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cache_key(params: &SearchParams) -> String {
        let digest = md5::compute(params.encode().as_bytes());
        format!("{:x}", digest)
    }

    fn lookup(&self, key: &str) -> Option<Page> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(cached) if cached.expires_at > Instant::now() => Some(cached.page.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: String, page: &Page) {
        let now = Instant::now();
        let mut entries = self.lock();

        if entries.len() >= self.capacity {
            entries.retain(|_, cached| cached.expires_at > now);
        }
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedPage {
                page: page.clone(),
                expires_at: now + self.ttl,
            },
        );
    }
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    async fn intercept(&self, params: SearchParams, next: Next<'_>) -> Result<Page> {
        let key = Self::cache_key(&params);

        if let Some(page) = self.lookup(&key) {
            tracing::debug!("Cache hit for query: {}", params.query);
            return Ok(page);
        }

        let page = next.run(params).await?;
        self.store(key, &page);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::transport::MockTransport;
    use std::sync::Arc;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
        <totalResults>3</totalResults><startIndex>0</startIndex><itemsPerPage>3</itemsPerPage>
        <entry><id>http://arxiv.org/abs/1</id><title>One</title></entry>
    </feed>"#;

    fn client(transport: Arc<MockTransport>, cache: Arc<CacheInterceptor>) -> Client {
        Client::builder()
            .transport(transport)
            .rate_limit(Duration::ZERO)
            .interceptor_arc(cache)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_search_is_served_from_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let cache = Arc::new(CacheInterceptor::new(Duration::from_secs(60)));
        let client = client(transport.clone(), cache.clone());

        let first = client.search(SearchParams::new("all:x")).await.unwrap();
        let second = client.search(SearchParams::new("all:x")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(cache.len(), 1);

        // Different parameters miss
        client
            .search(SearchParams::new("all:x").start(3))
            .await
            .unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let transport = Arc::new(MockTransport::new());
        transport.always_respond(200, FEED);
        let cache = Arc::new(CacheInterceptor::new(Duration::from_millis(10)));
        let client = client(transport.clone(), cache);

        client.search(SearchParams::new("all:x")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        client.search(SearchParams::new("all:x")).await.unwrap();

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(400, "bad");
        transport.always_respond(200, FEED);
        let cache = Arc::new(CacheInterceptor::new(Duration::from_secs(60)));
        let client = client(transport.clone(), cache.clone());

        assert!(client.search(SearchParams::new("all:x")).await.is_err());
        assert!(cache.is_empty());
        assert!(client.search(SearchParams::new("all:x")).await.is_ok());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = CacheInterceptor::new(Duration::from_secs(60)).with_capacity(2);
        let page = Page::default();
        cache.store("a".to_string(), &page);
        cache.store("b".to_string(), &page);
        cache.store("c".to_string(), &page);

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("a").is_none());
        assert!(cache.lookup("c").is_some());
    }
}
