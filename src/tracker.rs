//! HTTP tracker protocol (BEP-3)
//!
//! Announce requests with compact peer responses. The query string is built
//! by hand because the info hash and peer id are raw bytes that must be
//! percent-encoded exactly, not passed through a generic form serializer.

mod error;
mod http;
mod response;

pub use error::TrackerError;
pub use http::{url_encode, HttpTracker};
pub use response::{parse_compact_peers, AnnounceResponse};

#[cfg(test)]
mod tests;
