//! Query AST nodes and their wire encoding.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// Fixed 12-digit `YYYYMMDDhhmm` timestamp format used in date ranges
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Searchable text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Abstract,
    Author,
    Category,
    Comment,
    Journal,
    All,
}

impl Field {
    /// Wire prefix for this field
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "ti",
            Field::Abstract => "abs",
            Field::Author => "au",
            Field::Category => "cat",
            Field::Comment => "co",
            Field::Journal => "jr",
            Field::All => "all",
        }
    }
}

impl FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ti" => Ok(Field::Title),
            "abs" => Ok(Field::Abstract),
            "au" => Ok(Field::Author),
            "cat" => Ok(Field::Category),
            "co" => Ok(Field::Comment),
            "jr" => Ok(Field::Journal),
            "all" => Ok(Field::All),
            _ => Err(ParseError::UnknownField(s.to_string())),
        }
    }
}

/// Fields that accept a `[start TO end]` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    SubmittedDate,
    LastUpdatedDate,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::SubmittedDate => "submittedDate",
            DateField::LastUpdatedDate => "lastUpdatedDate",
        }
    }

    pub(crate) fn from_name(s: &str) -> Option<Self> {
        match s {
            "submittedDate" => Some(DateField::SubmittedDate),
            "lastUpdatedDate" => Some(DateField::LastUpdatedDate),
            _ => None,
        }
    }
}

/// Boolean operators, applied strictly left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    AndNot,
}

impl Operator {
    /// Canonical upper-case keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::AndNot => "ANDNOT",
        }
    }

    /// Case-insensitive keyword match
    pub fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("AND") {
            Some(Operator::And)
        } else if word.eq_ignore_ascii_case("OR") {
            Some(Operator::Or)
        } else if word.eq_ignore_ascii_case("ANDNOT") {
            Some(Operator::AndNot)
        } else {
            None
        }
    }
}

/// A single node of a query expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// `field:value` leaf
    Term { field: Field, value: String },
    /// Binds the node before it to the node after it
    Operator(Operator),
    /// Parenthesized sub-expression, never empty
    Group(Vec<QueryNode>),
    /// `field:[start TO end]`, both instants at minute precision
    DateRange {
        field: DateField,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl QueryNode {
    /// Encode this node into the wire grammar.
    ///
    /// Values are not percent-encoded; that happens when the query is placed
    /// into a request.
    pub fn encode(&self) -> String {
        match self {
            QueryNode::Term { field, value } => format!("{}:{}", field.as_str(), value),
            QueryNode::Operator(op) => op.as_str().to_string(),
            QueryNode::Group(children) => format!("({})", encode_nodes(children)),
            QueryNode::DateRange { field, start, end } => format!(
                "{}:[{} TO {}]",
                field.as_str(),
                start.format(TIMESTAMP_FORMAT),
                end.format(TIMESTAMP_FORMAT)
            ),
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, QueryNode::Operator(_))
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

pub(crate) fn encode_nodes(nodes: &[QueryNode]) -> String {
    nodes
        .iter()
        .map(QueryNode::encode)
        .collect::<Vec<_>>()
        .join(" ")
}
