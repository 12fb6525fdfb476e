//! lodestone - a minimal BitTorrent client library
//!
//! Implements the classic file-based download workflow and the magnet-link
//! metadata-exchange workflow against a single peer, following the relevant
//! BEP (BitTorrent Enhancement Proposal) specifications.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode encoding/decoding
//! - [`metainfo`] - BEP-3 torrent metainfo, BEP-9 magnet links
//! - [`tracker`] - BEP-3 HTTP tracker protocol with compact peers
//! - [`peer`] - BEP-3 peer wire protocol, BEP-10 extension protocol,
//!   BEP-9 metadata exchange, pipelined piece download
//! - [`client`] - the download flows composing the pieces above

pub mod bencode;
pub mod client;
pub mod constants;
pub mod metainfo;
pub mod peer;
pub mod tracker;

pub use bencode::{decode, encode, BencodeError, Value};
pub use client::{Client, ClientError};
pub use metainfo::{Info, InfoHash, MagnetLink, Metainfo, MetainfoError};
pub use peer::{Handshake, Message, PeerConnection, PeerError, PeerId};
pub use tracker::{AnnounceResponse, HttpTracker, TrackerError};
