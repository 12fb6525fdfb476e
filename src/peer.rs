//! Peer wire protocol (BEP-3, BEP-10, BEP-9)
//!
//! The TCP session with a single peer: handshake, length-prefixed message
//! framing, the extension sub-protocol, metadata exchange for magnet
//! downloads, and pipelined piece download.

mod connection;
mod download;
mod error;
mod extension;
mod message;
mod metadata;
mod peer_id;
mod transport;

pub use connection::PeerConnection;
pub use download::download_piece;
pub use error::PeerError;
pub use extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID, LOCAL_UT_METADATA_ID};
pub use message::{Handshake, Message, MessageId};
pub use metadata::{fetch_metadata, MetadataMessage, MetadataMessageType};
pub use peer_id::PeerId;
