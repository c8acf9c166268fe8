//! Entry model for a single paper in a result page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

/// Author of an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

/// Subject category, e.g. `cs.LG`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub term: String,
}

/// Link attached to an entry or a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Metadata for one paper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Abstract page URL, e.g. `http://arxiv.org/abs/2301.12345v1`
    pub id: String,

    pub title: String,

    /// Abstract
    pub summary: String,

    pub published: Option<DateTime<Utc>>,

    pub updated: Option<DateTime<Utc>>,

    pub authors: Vec<Author>,

    pub categories: Vec<Category>,

    pub primary_category: Option<Category>,

    pub links: Vec<Link>,

    /// Free-text comment (pages, figures, venue)
    pub comment: Option<String>,

    pub journal_ref: Option<String>,

    pub doi: Option<String>,
}

impl Entry {
    /// The bare arXiv identifier, without URL prefix or version suffix
    ///
    /// `http://arxiv.org/abs/2301.12345v2` becomes `2301.12345`, and old-style
    /// IDs like `math.GT/0104020v1` keep their archive prefix.
    pub fn arxiv_id(&self) -> &str {
        let id = match self.id.find("/abs/") {
            Some(pos) => &self.id[pos + 5..],
            None => self.id.as_str(),
        };
        strip_version(id)
    }

    /// Link to the PDF, falling back to the canonical PDF URL
    pub fn pdf_url(&self) -> String {
        self.links
            .iter()
            .find(|link| {
                link.title.as_deref() == Some("pdf")
                    || link.link_type.as_deref() == Some("application/pdf")
            })
            .map(|link| link.href.clone())
            .unwrap_or_else(|| format!("{}/{}", ARXIV_PDF_URL, self.arxiv_id()))
    }

    /// Author names joined with `"; "`
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Strip a trailing `vN` version suffix
fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(pos)
            if pos + 1 < id.len()
                && id[pos + 1..].bytes().all(|b| b.is_ascii_digit())
                && !id[..pos].ends_with('/') =>
        {
            &id[..pos]
        }
        _ => id,
    }
}
