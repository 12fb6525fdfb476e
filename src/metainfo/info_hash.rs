use std::fmt;

use sha1::{Digest, Sha1};

use super::error::MetainfoError;

/// A torrent's info hash: the SHA-1 of its bencoded info dictionary.
///
/// The hash identifies a torrent across the network. It travels in two
/// forms: 20 raw octets (handshake, tracker announce) and 40 lowercase hex
/// characters (magnet links, display).
///
/// # Examples
///
/// ```
/// use lodestone::metainfo::InfoHash;
///
/// let hash = InfoHash::from_hex("ad42ce8109f54c99613ce38f9b4d87e70f24a165").unwrap();
/// assert_eq!(hash.to_hex(), "ad42ce8109f54c99613ce38f9b4d87e70f24a165");
/// assert_eq!(hash.as_bytes().len(), 20);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    /// Creates an info hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an info hash by hashing bencoded info dictionary bytes.
    pub fn from_info_bytes(info_bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(info_bytes);
        Self(hasher.finalize().into())
    }

    /// Parses an info hash from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, MetainfoError> {
        if s.len() != 40 {
            return Err(MetainfoError::InvalidInfoHash);
        }
        let bytes = hex_decode(s).ok_or(MetainfoError::InvalidInfoHash)?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Returns the raw bytes of the info hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Converts to a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Percent-encodes the raw hash for use in tracker announce URLs.
    ///
    /// Unreserved ASCII (`A-Z a-z 0-9 - _ . ~`) passes through, everything
    /// else becomes `%HH` with uppercase hex.
    pub fn url_encode(&self) -> String {
        crate::tracker::url_encode(&self.0)
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        })
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
