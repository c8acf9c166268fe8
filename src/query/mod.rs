//! Query expressions for the arXiv search grammar.
//!
//! - [`Query`]: fluent builder over an ordered sequence of [`QueryNode`]s
//! - [`parse`]: wire string back into a [`Query`]
//!
//! Every string produced by the builder parses back to a query that encodes
//! to the same string, unless a term value itself contains a `%XX` sequence,
//! which parsing decodes.
//!
//! ```rust
//! use arxiv_search::query::{parse, Query};
//!
//! let built = Query::new()
//!     .category("cs.AI")
//!     .and()
//!     .group(|g| g.title("diffusion").or().abstract_text("score matching"));
//! let wire = built.to_string();
//!
//! assert_eq!(parse(&wire).unwrap().to_string(), wire);
//! ```

mod builder;
mod node;
mod parser;

pub use builder::Query;
pub use node::{DateField, Field, Operator, QueryNode};
pub use parser::{is_valid_query, parse, ParseError};

/// Encode a query to its wire string
pub fn encode(query: &Query) -> String {
    query.encode()
}
