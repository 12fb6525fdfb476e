//! Torrent metainfo and magnet links (BEP-3, BEP-9)
//!
//! Parsing of `.torrent` files into a typed view, raw info-dictionary
//! extraction for hashing, and magnet URI parsing.

mod error;
mod info_hash;
mod magnet;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use magnet::MagnetLink;
pub use torrent::{Info, Metainfo};
