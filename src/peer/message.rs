use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::PeerError;
use crate::constants::EXTENSION_BIT;

/// The BitTorrent protocol identifier.
pub const PROTOCOL: &[u8] = b"BitTorrent protocol";
/// Length of the handshake message in bytes.
pub const HANDSHAKE_LEN: usize = 68;

/// Message type identifiers in the peer wire protocol.
///
/// Each message (except keep-alive) has a one-byte ID following the length
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    /// Stop sending data to the peer.
    Choke = 0,
    /// Ready to send data to the peer.
    Unchoke = 1,
    /// Want data from the peer.
    Interested = 2,
    /// Announce all available pieces.
    Bitfield = 5,
    /// Request a data block.
    Request = 6,
    /// Send piece data.
    Piece = 7,
    /// Extension protocol message (BEP-10).
    Extended = 20,
}

/// The BitTorrent handshake message.
///
/// The handshake opens every peer connection: a protocol identifier,
/// 8 reserved bytes carrying capability flags, the torrent's info hash, and
/// the sender's peer ID. Reserved byte 5, bit `0x10` advertises the
/// extension protocol ([BEP-10]).
///
/// [BEP-10]: http://bittorrent.org/beps/bep_0010.html
#[derive(Debug, Clone)]
pub struct Handshake {
    /// The torrent's info hash.
    pub info_hash: [u8; 20],
    /// The sender's peer ID.
    pub peer_id: [u8; 20],
    /// Reserved bytes for protocol extensions.
    pub reserved: [u8; 8],
}

impl Handshake {
    /// Creates a handshake with all reserved bits cleared.
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        Self {
            info_hash,
            peer_id,
            reserved: [0u8; 8],
        }
    }

    /// Creates a handshake advertising extension protocol support.
    ///
    /// Only the magnet flow sets this bit; plain torrent downloads have no
    /// use for the extension protocol.
    pub fn with_extensions(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        let mut handshake = Self::new(info_hash, peer_id);
        handshake.reserved[5] |= EXTENSION_BIT;
        handshake
    }

    /// Returns `true` if the sender supports the extension protocol.
    pub fn supports_extensions(&self) -> bool {
        (self.reserved[5] & EXTENSION_BIT) != 0
    }

    /// Encodes the handshake to its 68-byte wire form.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HANDSHAKE_LEN);
        buf.put_u8(19);
        buf.put_slice(PROTOCOL);
        buf.put_slice(&self.reserved);
        buf.put_slice(&self.info_hash);
        buf.put_slice(&self.peer_id);
        buf.freeze()
    }

    /// Decodes a 68-byte handshake.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::HandshakeRejected`] when the length or the
    /// protocol string does not match.
    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        if data.len() < HANDSHAKE_LEN {
            return Err(PeerError::HandshakeRejected);
        }

        if data[0] != 19 || &data[1..20] != PROTOCOL {
            return Err(PeerError::HandshakeRejected);
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&data[20..28]);

        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&data[28..48]);

        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&data[48..68]);

        Ok(Self {
            info_hash,
            peer_id,
            reserved,
        })
    }
}

/// A peer wire protocol message.
///
/// Messages are length-prefixed: a 4-byte big-endian length, then a 1-byte
/// message ID (except keep-alive, which is length 0) and payload. IDs this
/// client does not act on decode to [`Message::Unknown`] so that unexpected
/// traffic can be discarded instead of killing the session.
///
/// # Examples
///
/// ```
/// use lodestone::peer::Message;
///
/// let request = Message::Request {
///     index: 0,
///     begin: 0,
///     length: 16384,
/// };
///
/// let bytes = request.encode();
/// assert_eq!(bytes.len(), 17); // 4-byte length + 1-byte ID + 12-byte payload
/// ```
#[derive(Debug, Clone)]
pub enum Message {
    /// Empty message to keep the connection alive.
    KeepAlive,
    /// The peer is choking us (no data will be sent).
    Choke,
    /// The peer unchoked us (requests will be answered).
    Unchoke,
    /// We are interested in the peer's data.
    Interested,
    /// Bitfield of the pieces the peer has; this client discards it.
    Bitfield(Bytes),
    /// Request a block of data.
    Request { index: u32, begin: u32, length: u32 },
    /// A block of piece data.
    Piece { index: u32, begin: u32, data: Bytes },
    /// Extension protocol message ([BEP-10]).
    ///
    /// [BEP-10]: http://bittorrent.org/beps/bep_0010.html
    Extended { id: u8, payload: Bytes },
    /// Any other message ID; tolerated and dropped.
    Unknown { id: u8, payload: Bytes },
}

impl Message {
    /// Encodes the message to bytes for transmission, length prefix included.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        match self {
            Message::KeepAlive => {
                buf.put_u32(0);
            }
            Message::Choke => {
                buf.put_u32(1);
                buf.put_u8(MessageId::Choke as u8);
            }
            Message::Unchoke => {
                buf.put_u32(1);
                buf.put_u8(MessageId::Unchoke as u8);
            }
            Message::Interested => {
                buf.put_u32(1);
                buf.put_u8(MessageId::Interested as u8);
            }
            Message::Bitfield(bits) => {
                buf.put_u32(1 + bits.len() as u32);
                buf.put_u8(MessageId::Bitfield as u8);
                buf.put_slice(bits);
            }
            Message::Request {
                index,
                begin,
                length,
            } => {
                buf.put_u32(13);
                buf.put_u8(MessageId::Request as u8);
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_u32(*length);
            }
            Message::Piece { index, begin, data } => {
                buf.put_u32(9 + data.len() as u32);
                buf.put_u8(MessageId::Piece as u8);
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_slice(data);
            }
            Message::Extended { id, payload } => {
                buf.put_u32(2 + payload.len() as u32);
                buf.put_u8(MessageId::Extended as u8);
                buf.put_u8(*id);
                buf.put_slice(payload);
            }
            Message::Unknown { id, payload } => {
                buf.put_u32(1 + payload.len() as u32);
                buf.put_u8(*id);
                buf.put_slice(payload);
            }
        }

        buf.freeze()
    }

    /// Decodes one complete framed message (length prefix included).
    pub fn decode(mut data: Bytes) -> Result<Self, PeerError> {
        if data.len() < 4 {
            return Err(PeerError::InvalidMessage("missing length prefix"));
        }

        let length = data.get_u32() as usize;

        if length == 0 {
            return Ok(Message::KeepAlive);
        }

        if data.remaining() < length {
            return Err(PeerError::InvalidMessage("incomplete message"));
        }

        let id = data.get_u8();

        match id {
            0 => Ok(Message::Choke),
            1 => Ok(Message::Unchoke),
            2 => Ok(Message::Interested),
            5 => Ok(Message::Bitfield(data.copy_to_bytes(length - 1))),
            6 => {
                if data.remaining() < 12 {
                    return Err(PeerError::InvalidMessage("request too short"));
                }
                Ok(Message::Request {
                    index: data.get_u32(),
                    begin: data.get_u32(),
                    length: data.get_u32(),
                })
            }
            7 => {
                if data.remaining() < 8 {
                    return Err(PeerError::InvalidMessage("piece too short"));
                }
                let index = data.get_u32();
                let begin = data.get_u32();
                let block = data.copy_to_bytes(length - 9);
                Ok(Message::Piece {
                    index,
                    begin,
                    data: block,
                })
            }
            20 => {
                if data.remaining() < 1 {
                    return Err(PeerError::InvalidMessage("extended too short"));
                }
                let ext_id = data.get_u8();
                let payload = data.copy_to_bytes(length - 2);
                Ok(Message::Extended {
                    id: ext_id,
                    payload,
                })
            }
            other => Ok(Message::Unknown {
                id: other,
                payload: data.copy_to_bytes(length - 1),
            }),
        }
    }
}
