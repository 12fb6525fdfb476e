//! Protocol constants and tuning parameters.

use std::time::Duration;

/// Client ID prefix for peer ID generation (Azureus-style)
pub const CLIENT_PREFIX: &str = "-LD0001-";

/// Default BitTorrent listen port, reported in tracker announces
pub const DEFAULT_PORT: u16 = 6881;

/// Extension protocol bit, reserved byte 5 of the handshake (BEP-10)
pub const EXTENSION_BIT: u8 = 0x10;

/// Block size for piece requests (16KB, BEP-3 convention)
pub const BLOCK_SIZE: u32 = 16384;

/// Metadata piece size (BEP-9)
pub const METADATA_PIECE_SIZE: usize = 16384;

/// Maximum accepted peer message size (16MB)
pub const MAX_MESSAGE_SIZE: usize = 16777216;

/// Maximum accepted metadata size (1MB)
pub const MAX_METADATA_SIZE: usize = 1048576;

/// Socket read timeout; tripping it closes the connection
pub const PEER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Socket write timeout
pub const PEER_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP tracker request timeout
pub const HTTP_TRACKER_TIMEOUT: Duration = Duration::from_secs(30);

/// `left` value announced for magnet downloads before the metadata (and
/// with it the real file length) is known; trackers only require a
/// positive number here
pub const MAGNET_LEFT_PLACEHOLDER: u64 = 999;
