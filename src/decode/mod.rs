//! Response decoders: raw response body to [`Page`].

mod atom;

pub use atom::AtomDecoder;

use crate::error::Error;
use crate::models::Page;
use crate::transport::RawResponse;

/// Parses a successful response body into a result page
pub trait Decoder: Send + Sync + std::fmt::Debug {
    fn decode(&self, response: &RawResponse) -> Result<Page, Error>;
}
