//! Metadata exchange extension (ut_metadata, BEP-9).
//!
//! Fetches the info dictionary from a peer, piece by piece, when a download
//! starts from a magnet link instead of a torrent file.

use std::collections::BTreeMap;

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tracing::debug;

use super::connection::PeerConnection;
use super::error::PeerError;
use super::extension::LOCAL_UT_METADATA_ID;
use super::message::Message;
use crate::bencode::{decode_prefix, encode, Value};
use crate::constants::{MAX_METADATA_SIZE, METADATA_PIECE_SIZE};
use crate::metainfo::InfoHash;

/// Message types for the ut_metadata extension (BEP-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMessageType {
    /// Request a piece of metadata.
    Request = 0,
    /// Provide a piece of metadata.
    Data = 1,
    /// Reject a metadata request.
    Reject = 2,
}

impl MetadataMessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MetadataMessageType::Request),
            1 => Some(MetadataMessageType::Data),
            2 => Some(MetadataMessageType::Reject),
            _ => None,
        }
    }
}

/// A metadata exchange message.
///
/// The wire form is a bencoded dictionary (`msg_type`, `piece`, and
/// `total_size` for data messages) followed, for data messages, by the raw
/// metadata piece bytes.
#[derive(Debug, Clone)]
pub struct MetadataMessage {
    pub msg_type: MetadataMessageType,
    pub piece: u32,
    /// Total metadata size; data messages only.
    pub total_size: Option<i64>,
    /// Raw piece bytes; data messages only.
    pub data: Option<Bytes>,
}

impl MetadataMessage {
    /// Creates a request for a metadata piece.
    pub fn request(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Request,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Encodes the message for transmission.
    pub fn encode(&self) -> Bytes {
        let mut dict = BTreeMap::new();

        dict.insert(
            Bytes::from_static(b"msg_type"),
            Value::Integer(self.msg_type as i64),
        );
        dict.insert(
            Bytes::from_static(b"piece"),
            Value::Integer(self.piece as i64),
        );

        if let Some(total_size) = self.total_size {
            dict.insert(Bytes::from_static(b"total_size"), Value::Integer(total_size));
        }

        let mut out = encode(&Value::Dict(dict));
        if let Some(ref data) = self.data {
            out.extend_from_slice(data);
        }

        Bytes::from(out)
    }

    /// Decodes a metadata message.
    ///
    /// The bencoded header is split from the trailing raw bytes by decoding
    /// one leading value and noting where the cursor stopped.
    pub fn decode(payload: &[u8]) -> Result<Self, PeerError> {
        let (value, dict_end) = decode_prefix(payload)?;
        let dict = value
            .as_dict()
            .ok_or(PeerError::InvalidMessage("metadata message not a dict"))?;

        let msg_type = dict
            .get(b"msg_type".as_slice())
            .and_then(|v| v.as_integer())
            .and_then(|v| u8::try_from(v).ok())
            .and_then(MetadataMessageType::from_byte)
            .ok_or(PeerError::InvalidMessage("bad metadata msg_type"))?;

        let piece = dict
            .get(b"piece".as_slice())
            .and_then(|v| v.as_integer())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(PeerError::InvalidMessage("bad metadata piece index"))?;

        let total_size = dict
            .get(b"total_size".as_slice())
            .and_then(|v| v.as_integer());

        let data = if msg_type == MetadataMessageType::Data {
            Some(Bytes::copy_from_slice(&payload[dict_end..]))
        } else {
            None
        };

        Ok(Self {
            msg_type,
            piece,
            total_size,
            data,
        })
    }
}

/// Fetches the complete info dictionary from the peer.
///
/// Requires a completed extension handshake that advertised `ut_metadata`
/// and a metadata size. Pieces are requested in order; responses addressed
/// to our advertised `ut_metadata` ID are consumed and everything else
/// (bitfields, request echoes from the peer) is ignored. The assembled
/// bytes must hash to the magnet's info hash.
///
/// # Errors
///
/// - [`PeerError::MetadataUnsupported`] without a usable handshake
/// - [`PeerError::MetadataRejected`] if the peer rejects a request
/// - [`PeerError::MetadataHashMismatch`] if verification fails
pub async fn fetch_metadata(
    conn: &mut PeerConnection,
    info_hash: &InfoHash,
) -> Result<Bytes, PeerError> {
    let ext_id = conn
        .metadata_extension_id()
        .ok_or(PeerError::MetadataUnsupported)?;
    let metadata_size = match conn.metadata_size() {
        Some(size) if size > 0 && size <= MAX_METADATA_SIZE as i64 => size as usize,
        _ => return Err(PeerError::MetadataUnsupported),
    };

    let piece_count = metadata_size.div_ceil(METADATA_PIECE_SIZE);
    let mut metadata = Vec::with_capacity(metadata_size);

    debug!(size = metadata_size, pieces = piece_count, "fetching metadata");

    for piece in 0..piece_count as u32 {
        conn.send(Message::Extended {
            id: ext_id,
            payload: MetadataMessage::request(piece).encode(),
        })
        .await?;

        loop {
            let Message::Extended { id, payload } = conn.receive().await? else {
                continue;
            };

            if id != LOCAL_UT_METADATA_ID {
                continue;
            }

            let message = MetadataMessage::decode(&payload)?;
            match message.msg_type {
                MetadataMessageType::Data => {
                    if message.piece != piece {
                        continue;
                    }
                    if let Some(data) = message.data {
                        metadata.extend_from_slice(&data);
                    }
                    break;
                }
                MetadataMessageType::Reject => return Err(PeerError::MetadataRejected),
                // The peer may request metadata from us in turn; we have
                // nothing to serve and drop it.
                MetadataMessageType::Request => continue,
            }
        }
    }

    let mut hasher = Sha1::new();
    hasher.update(&metadata);
    let digest: [u8; 20] = hasher.finalize().into();

    if digest != *info_hash.as_bytes() {
        return Err(PeerError::MetadataHashMismatch);
    }

    Ok(Bytes::from(metadata))
}
