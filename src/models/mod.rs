//! Core data models for search requests and result pages.

mod entry;
mod page;
mod search;

pub use entry::{Author, Category, Entry, Link};
pub use page::Page;
pub use search::{RequestMethod, SearchParams, SortBy, SortOrder, MAX_RESULTS_LIMIT, MAX_START};
