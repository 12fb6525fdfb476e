use thiserror::Error;

/// Errors that can occur while decoding bencode.
///
/// # Examples
///
/// ```
/// use lodestone::bencode::{decode, BencodeError};
///
/// // Truncated input
/// let result = decode(b"i42");
/// assert!(matches!(result, Err(BencodeError::UnexpectedEof)));
///
/// // Invalid integer (leading zeros)
/// let result = decode(b"i007e");
/// assert!(matches!(result, Err(BencodeError::InvalidInteger(_))));
///
/// // Trailing data
/// let result = decode(b"i42eextra");
/// assert!(matches!(result, Err(BencodeError::TrailingData)));
/// ```
#[derive(Debug, Error)]
pub enum BencodeError {
    /// Input ended before a complete value was parsed.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Integer is malformed (leading zeros, negative zero, empty, overflow).
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Byte string length prefix is not a valid number.
    #[error("invalid string length")]
    InvalidLength,

    /// Encountered an unexpected character while parsing.
    #[error("unexpected character: {0}")]
    UnexpectedChar(char),

    /// Extra data exists after the bencode value.
    #[error("trailing data after value")]
    TrailingData,

    /// Recursion limit (256 levels) exceeded.
    #[error("nesting too deep")]
    NestingTooDeep,
}
