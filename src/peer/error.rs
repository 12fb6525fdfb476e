use thiserror::Error;

/// Errors that can occur during peer communication.
///
/// Every variant is fatal to the operation that produced it; there is no
/// retry or peer fallback at this layer.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A socket read or write exceeded its timeout.
    #[error("timeout")]
    Timeout,

    /// The connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer's handshake had the wrong length or protocol string.
    #[error("handshake rejected")]
    HandshakeRejected,

    /// The peer echoed a different info hash than ours.
    #[error("info hash mismatch")]
    InfoHashMismatch,

    /// Received a malformed protocol message.
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),

    /// The peer did not set the extension bit but the flow requires it.
    #[error("peer does not support extensions")]
    ExtensionsNotSupported,

    /// The peer did not advertise `ut_metadata` or a usable metadata size.
    #[error("peer does not support the metadata extension")]
    MetadataUnsupported,

    /// The peer rejected a metadata piece request.
    #[error("metadata request rejected")]
    MetadataRejected,

    /// The assembled metadata does not hash to the magnet's info hash.
    #[error("metadata hash mismatch")]
    MetadataHashMismatch,

    /// A downloaded piece failed SHA-1 verification.
    #[error("piece {0} hash mismatch")]
    PieceHashMismatch(u32),

    /// Error decoding bencode in extension messages.
    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),
}
