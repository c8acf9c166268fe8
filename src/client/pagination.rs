//! Lazy iteration over every entry of a paginated result set.

use futures_util::stream::Stream;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::Client;
use crate::error::Error;
use crate::models::{Entry, SearchParams};

/// Pull iterator that yields entries one at a time across pages.
///
/// A page is fetched only when the entries already buffered run out, so a
/// consumer that stops early never triggers a request it does not need.
/// The sequence ends when the result set is exhausted or a search fails;
/// a failure is not yielded but is kept for [`SearchIter::last_error`].
pub struct SearchIter {
    client: Client,
    params: SearchParams,
    cancel: CancellationToken,
    buffer: VecDeque<Entry>,
    pages_fetched: usize,
    done: bool,
    last_error: Option<Error>,
}

impl SearchIter {
    pub(crate) fn new(client: Client, params: SearchParams, cancel: CancellationToken) -> Self {
        Self {
            client,
            params,
            cancel,
            buffer: VecDeque::new(),
            pages_fetched: 0,
            done: false,
            last_error: None,
        }
    }

    /// Next entry, fetching the following page if the buffer is empty
    pub async fn next(&mut self) -> Option<Entry> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(entry);
            }
            if self.done {
                return None;
            }
            self.fetch_page().await;
        }
    }

    async fn fetch_page(&mut self) {
        let result = self
            .client
            .search_with_cancel(self.params.clone(), &self.cancel)
            .await;

        match result {
            Ok(page) => {
                self.pages_fetched += 1;
                // A zero page size cannot advance the cursor
                if page.has_more() && page.items_per_page > 0 {
                    self.params.start = page.next_start();
                } else {
                    self.done = true;
                }
                self.buffer.extend(page.entries);
            }
            Err(e) => {
                warn!(
                    start = self.params.start,
                    "Stopping iteration after failed search: {}", e
                );
                self.last_error = Some(e);
                self.done = true;
            }
        }
    }

    /// Error that ended the sequence early, if any
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Number of pages requested so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether no further entries will be produced
    pub fn is_done(&self) -> bool {
        self.done && self.buffer.is_empty()
    }

    /// Consume the iterator as a `Stream` of entries
    pub fn into_stream(self) -> impl Stream<Item = Entry> {
        async_stream::stream! {
            let mut iter = self;
            while let Some(entry) = iter.next().await {
                yield entry;
            }
        }
    }
}

impl std::fmt::Debug for SearchIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIter")
            .field("params", &self.params)
            .field("buffered", &self.buffer.len())
            .field("pages_fetched", &self.pages_fetched)
            .field("done", &self.done)
            .finish()
    }
}
