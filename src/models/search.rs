//! Search request parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::query::Query;

/// Largest page size the API accepts
pub const MAX_RESULTS_LIMIT: usize = 2000;
/// Largest start offset the API accepts
pub const MAX_START: usize = 30000;

/// Sort field for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "relevance" => Ok(SortBy::Relevance),
            "lastUpdatedDate" => Ok(SortBy::LastUpdatedDate),
            "submittedDate" => Ok(SortBy::SubmittedDate),
            _ => Err(Error::Validation(format!("unknown sort field: {}", s))),
        }
    }
}

/// Sort order for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascending" => Ok(SortOrder::Ascending),
            "descending" => Ok(SortOrder::Descending),
            _ => Err(Error::Validation(format!("unknown sort order: {}", s))),
        }
    }
}

/// HTTP method used for search requests; the API accepts both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => f.write_str("GET"),
            RequestMethod::Post => f.write_str("POST"),
        }
    }
}

/// Parameters for a single search request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    /// Wire-grammar query string
    pub query: String,

    /// Explicit arXiv IDs to fetch
    pub id_list: Vec<String>,

    /// Offset of the first result
    pub start: usize,

    /// Page size (0 lets the server choose)
    pub max_results: usize,

    pub sort_by: Option<SortBy>,

    pub sort_order: Option<SortOrder>,
}

impl SearchParams {
    /// Create parameters for a query; accepts a raw string or a built [`Query`]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Create parameters that look up explicit IDs
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_list: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Replace the query with a built one
    pub fn query(mut self, query: &Query) -> Self {
        self.query = query.encode();
        self
    }

    pub fn id_list<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_list = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = Some(sort);
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order);
        self
    }

    /// Check protocol-documented bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_results > MAX_RESULTS_LIMIT {
            return Err(Error::Validation(format!(
                "max_results cannot exceed {}",
                MAX_RESULTS_LIMIT
            )));
        }
        if self.start > MAX_START {
            return Err(Error::Validation(format!(
                "start cannot exceed {}",
                MAX_START
            )));
        }
        Ok(())
    }

    /// Form-encode into the request query string; empty and zero values are omitted
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());

        if !self.query.is_empty() {
            serializer.append_pair("search_query", &self.query);
        }
        let ids: Vec<&str> = self
            .id_list
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if !ids.is_empty() {
            serializer.append_pair("id_list", &ids.join(","));
        }
        if self.start > 0 {
            serializer.append_pair("start", &self.start.to_string());
        }
        if self.max_results > 0 {
            serializer.append_pair("max_results", &self.max_results.to_string());
        }
        if let Some(sort_by) = self.sort_by {
            serializer.append_pair("sortBy", sort_by.as_str());
        }
        if let Some(sort_order) = self.sort_order {
            serializer.append_pair("sortOrder", sort_order.as_str());
        }

        serializer.finish()
    }
}
