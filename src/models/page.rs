//! A single page of search results and its cursor arithmetic.

use serde::{Deserialize, Serialize};

use super::entry::{Entry, Link};
use super::search::SearchParams;

/// One page of results as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Entries in server order
    pub entries: Vec<Entry>,

    /// Offset of the first entry
    pub start_index: usize,

    /// Page size reported by the server
    pub items_per_page: usize,

    /// Size of the full result set
    pub total_results: usize,

    /// Feed title, which echoes the query
    pub title: String,

    /// Feed ID, as a URL
    pub id: String,

    /// When the feed was generated
    pub updated: String,

    pub links: Vec<Link>,

    /// Parameters that produced this page
    #[serde(default)]
    pub params: SearchParams,
}

impl Page {
    /// More results exist after this page.
    ///
    /// A cursor that would overflow counts as the end of the result set.
    pub fn has_more(&self) -> bool {
        self.total_results > 0
            && self
                .start_index
                .checked_add(self.items_per_page)
                .is_some_and(|end| end < self.total_results)
    }

    /// Results exist before this page
    pub fn has_previous(&self) -> bool {
        self.total_results > 0 && self.start_index > 0
    }

    /// Start offset of the next page
    pub fn next_start(&self) -> usize {
        self.start_index.saturating_add(self.items_per_page)
    }

    /// Start offset of the previous page, clamped at zero
    pub fn previous_start(&self) -> usize {
        self.start_index.saturating_sub(self.items_per_page)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
