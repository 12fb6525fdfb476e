use std::fmt;

use rand::Rng as _;

use crate::constants::CLIENT_PREFIX;

/// A 20-byte peer identifier.
///
/// Generated once per process with an Azureus-style client prefix; the same
/// ID is used in every tracker announce and handshake of that process.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    pub fn generate() -> Self {
        let mut id = [0u8; 20];
        id[..8].copy_from_slice(CLIENT_PREFIX.as_bytes());
        rand::rng().fill(&mut id[8..]);
        Self(id)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 20 {
            return None;
        }
        let mut id = [0u8; 20];
        id.copy_from_slice(bytes);
        Some(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Formats the ID as 40 hex characters, the way peer IDs are shown to
    /// users.
    pub fn to_hex(&self) -> String {
        self.0.iter().fold(String::with_capacity(40), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        })
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_hex())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
