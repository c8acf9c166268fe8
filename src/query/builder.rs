//! Fluent query builder.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

use super::node::{encode_nodes, DateField, Field, Operator, QueryNode};
use super::{parse, ParseError};

/// An ordered sequence of query nodes.
///
/// Nodes are applied strictly left to right; there is no implicit precedence.
/// The sequence never starts with an operator: operator calls on an empty
/// query are ignored.
///
/// ```rust
/// use arxiv_search::Query;
///
/// let query = Query::new()
///     .title("graph neural networks")
///     .and()
///     .category("cs.LG")
///     .and_not()
///     .author("Doe, John");
///
/// assert_eq!(
///     query.to_string(),
///     "ti:graph neural networks AND cat:cs.LG ANDNOT au:Doe, John"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    nodes: Vec<QueryNode>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Parse a wire string into a query.
    ///
    /// Term values are percent-decoded, so a literal `%XX` sequence added with
    /// the builder comes back decoded and does not round-trip.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        parse(s)
    }

    /// Top-level nodes in insertion order
    pub fn nodes(&self) -> &[QueryNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Encode to the wire grammar
    pub fn encode(&self) -> String {
        encode_nodes(&self.nodes)
    }

    /// Add a term for an arbitrary field
    pub fn term(mut self, field: Field, value: impl Into<String>) -> Self {
        self.nodes.push(QueryNode::Term {
            field,
            value: value.into(),
        });
        self
    }

    /// Add a title search term
    pub fn title(self, value: impl Into<String>) -> Self {
        self.term(Field::Title, value)
    }

    /// Add an abstract search term
    pub fn abstract_text(self, value: impl Into<String>) -> Self {
        self.term(Field::Abstract, value)
    }

    /// Add an author search term
    pub fn author(self, value: impl Into<String>) -> Self {
        self.term(Field::Author, value)
    }

    /// Add a subject category term, e.g. `cs.LG`
    pub fn category(self, value: impl Into<String>) -> Self {
        self.term(Field::Category, value)
    }

    /// Add a comment search term
    pub fn comment(self, value: impl Into<String>) -> Self {
        self.term(Field::Comment, value)
    }

    /// Add a journal reference search term
    pub fn journal(self, value: impl Into<String>) -> Self {
        self.term(Field::Journal, value)
    }

    /// Add a term matched against all fields
    pub fn all(self, value: impl Into<String>) -> Self {
        self.term(Field::All, value)
    }

    /// Append an operator, unless the query is empty
    pub fn operator(mut self, op: Operator) -> Self {
        if !self.nodes.is_empty() {
            self.nodes.push(QueryNode::Operator(op));
        }
        self
    }

    pub fn and(self) -> Self {
        self.operator(Operator::And)
    }

    pub fn or(self) -> Self {
        self.operator(Operator::Or)
    }

    pub fn and_not(self) -> Self {
        self.operator(Operator::AndNot)
    }

    /// Add a parenthesized sub-query built by `build`.
    ///
    /// An empty group is dropped.
    pub fn group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(Query) -> Query,
    {
        let group = build(Query::new());
        if !group.nodes.is_empty() {
            self.nodes.push(QueryNode::Group(group.nodes));
        }
        self
    }

    /// Restrict by submission date (inclusive range, minute precision)
    pub fn submitted_between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range(DateField::SubmittedDate, start, end)
    }

    /// Restrict by last-updated date (inclusive range, minute precision)
    pub fn last_updated_between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range(DateField::LastUpdatedDate, start, end)
    }

    /// Append a date range, preceded by an implicit `AND` when it follows a
    /// non-operator node.
    ///
    /// Timestamps are encoded as four-digit years, so instants outside
    /// years 0000 to 9999 are clamped to the nearest representable minute.
    pub fn date_range(mut self, field: DateField, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if self.nodes.last().is_some_and(|node| !node.is_operator()) {
            self.nodes.push(QueryNode::Operator(Operator::And));
        }
        self.nodes.push(QueryNode::DateRange {
            field,
            start: to_wire_precision(start),
            end: to_wire_precision(end),
        });
        self
    }

    pub(crate) fn push_group(&mut self, group: Query) {
        if !group.nodes.is_empty() {
            self.nodes.push(QueryNode::Group(group.nodes));
        }
    }
}

fn to_wire_precision(t: DateTime<Utc>) -> DateTime<Utc> {
    let clamped = match t.year() {
        year if year < 0 => Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).single(),
        year if year > 9999 => Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 0).single(),
        _ => None,
    };
    let t = clamped.unwrap_or(t);

    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Query {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> Self {
        query.encode()
    }
}

impl From<&Query> for String {
    fn from(query: &Query) -> Self {
        query.encode()
    }
}
