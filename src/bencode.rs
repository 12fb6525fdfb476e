//! Bencode encoding and decoding (BEP-3)
//!
//! Bencode is the serialization format BitTorrent uses for torrent files,
//! tracker responses, and extension messages. Byte strings are opaque octet
//! sequences; they are never assumed to be UTF-8.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix, skip_value};
pub use encode::encode;
pub use error::BencodeError;
pub use value::Value;

#[cfg(test)]
mod tests;
