//! Atom feed decoder for arXiv API responses.
//!
//! Element names are matched on their local part, so `opensearch:totalResults`
//! and `arxiv:doi` are found regardless of the prefix the server binds.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::Decoder;
use crate::error::Error;
use crate::models::{Author, Category, Entry, Link, Page};
use crate::transport::RawResponse;

/// Decoder for the Atom feeds returned by the arXiv API
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomDecoder;

impl AtomDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Parse a full feed document
    pub fn parse_feed(xml: &str) -> Result<Page, Error> {
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();

        let mut page = Page::default();
        let mut entry: Option<Entry> = None;
        let mut author: Option<Author> = None;
        let mut text = String::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    text.clear();
                    match e.local_name().as_ref() {
                        b"entry" => entry = Some(Entry::default()),
                        b"author" if entry.is_some() => author = Some(Author::default()),
                        _ => handle_attributes(e, &mut page, entry.as_mut())?,
                    }
                }
                Ok(Event::Empty(ref e)) => handle_attributes(e, &mut page, entry.as_mut())?,
                Ok(Event::Text(e)) => {
                    let unescaped = e
                        .unescape()
                        .map_err(|e| Error::Decode(format!("XML text error: {}", e)))?;
                    text.push_str(&unescaped);
                }
                Ok(Event::CData(e)) => {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
                Ok(Event::End(ref e)) => {
                    let value = normalize(&text);
                    text.clear();
                    let name = e.local_name();

                    if let Some(current) = author.as_mut() {
                        match name.as_ref() {
                            b"name" => current.name = value,
                            b"affiliation" => current.affiliation = non_empty(value),
                            b"author" => {
                                if let (Some(done), Some(target)) = (author.take(), entry.as_mut())
                                {
                                    target.authors.push(done);
                                }
                            }
                            _ => {}
                        }
                    } else if let Some(current) = entry.as_mut() {
                        match name.as_ref() {
                            b"id" => current.id = value,
                            b"title" => current.title = value,
                            b"summary" => current.summary = value,
                            b"published" => current.published = parse_date(&value)?,
                            b"updated" => current.updated = parse_date(&value)?,
                            b"comment" => current.comment = non_empty(value),
                            b"journal_ref" => current.journal_ref = non_empty(value),
                            b"doi" => current.doi = non_empty(value),
                            b"entry" => {
                                if let Some(done) = entry.take() {
                                    page.entries.push(done);
                                }
                            }
                            _ => {}
                        }
                    } else {
                        match name.as_ref() {
                            b"title" => page.title = value,
                            b"id" => page.id = value,
                            b"updated" => page.updated = value,
                            b"totalResults" => page.total_results = parse_count(&value)?,
                            b"startIndex" => page.start_index = parse_count(&value)?,
                            b"itemsPerPage" => page.items_per_page = parse_count(&value)?,
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {
                    // Declarations, comments, processing instructions
                }
                Err(e) => {
                    return Err(Error::Decode(format!(
                        "XML parsing error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
            buf.clear();
        }

        if entry.is_some() {
            return Err(Error::Decode("unterminated entry element".to_string()));
        }

        Ok(page)
    }
}

impl Decoder for AtomDecoder {
    fn decode(&self, response: &RawResponse) -> Result<Page, Error> {
        Self::parse_feed(&response.body)
    }
}

/// Extract `link`, `category`, and `primary_category` attributes
fn handle_attributes(
    e: &BytesStart<'_>,
    page: &mut Page,
    entry: Option<&mut Entry>,
) -> Result<(), Error> {
    match e.local_name().as_ref() {
        b"link" => {
            let link = Link {
                href: get_attr(e, "href")?.unwrap_or_default(),
                rel: get_attr(e, "rel")?,
                link_type: get_attr(e, "type")?,
                title: get_attr(e, "title")?,
            };
            match entry {
                Some(entry) => entry.links.push(link),
                None => page.links.push(link),
            }
        }
        b"category" => {
            if let (Some(entry), Some(term)) = (entry, get_attr(e, "term")?) {
                entry.categories.push(Category { term });
            }
        }
        b"primary_category" => {
            if let (Some(entry), Some(term)) = (entry, get_attr(e, "term")?) {
                entry.primary_category = Some(Category { term });
            }
        }
        _ => {}
    }
    Ok(())
}

fn get_attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, Error> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Decode(format!("XML attribute error: {}", e)))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Decode(format!("XML attribute error: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Collapse runs of whitespace (titles and abstracts are hard-wrapped)
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_count(value: &str) -> Result<usize, Error> {
    value
        .parse()
        .map_err(|_| Error::Decode(format!("invalid count: {:?}", value)))
}

fn parse_date(value: &str) -> Result<Option<DateTime<Utc>>, Error> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|d| Some(d.with_timezone(&Utc)))
        .map_err(|e| Error::Decode(format!("invalid timestamp {:?}: {}", value, e)))
}
