use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::PeerError;
use crate::bencode::{decode, encode, Value};

/// Extended message ID of the extension handshake itself (BEP-10).
pub const EXTENSION_HANDSHAKE_ID: u8 = 0;

/// The extended message ID we ask peers to use for `ut_metadata` traffic
/// sent to us; advertised in our extension handshake `m` dictionary.
pub const LOCAL_UT_METADATA_ID: u8 = 1;

/// The extension protocol handshake dictionary (BEP-10).
///
/// Carried in an `Extended` message with ID 0. The `m` dictionary maps
/// extension names to the message IDs the sender wants the receiver to use;
/// `metadata_size` is present when the sender supports `ut_metadata`.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHandshake {
    /// Extension name to extended-message ID, from the `m` dictionary.
    pub extensions: BTreeMap<String, u8>,
    /// Size in bytes of the info dictionary (`metadata_size`).
    pub metadata_size: Option<i64>,
}

impl ExtensionHandshake {
    /// The handshake this client sends: `m = {"ut_metadata": 1}`.
    ///
    /// Encodes to exactly `d1:md11:ut_metadatai1eee`.
    pub fn ours() -> Self {
        let mut extensions = BTreeMap::new();
        extensions.insert("ut_metadata".to_string(), LOCAL_UT_METADATA_ID);
        Self {
            extensions,
            metadata_size: None,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut m = BTreeMap::new();
        for (name, id) in &self.extensions {
            m.insert(
                Bytes::copy_from_slice(name.as_bytes()),
                Value::Integer(*id as i64),
            );
        }

        let mut dict = BTreeMap::new();
        dict.insert(Bytes::from_static(b"m"), Value::Dict(m));

        if let Some(size) = self.metadata_size {
            dict.insert(Bytes::from_static(b"metadata_size"), Value::Integer(size));
        }

        Bytes::from(encode(&Value::Dict(dict)))
    }

    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        let value = decode(data)?;
        let dict = value
            .as_dict()
            .ok_or(PeerError::InvalidMessage("extension handshake not a dict"))?;

        let mut handshake = Self::default();

        if let Some(m) = dict.get(b"m".as_slice()).and_then(|v| v.as_dict()) {
            for (key, val) in m {
                if let (Ok(name), Some(id)) = (std::str::from_utf8(key), val.as_integer()) {
                    if id > 0 && id <= u8::MAX as i64 {
                        handshake.extensions.insert(name.to_string(), id as u8);
                    }
                }
            }
        }

        handshake.metadata_size = dict
            .get(b"metadata_size".as_slice())
            .and_then(|v| v.as_integer());

        Ok(handshake)
    }

    /// Returns the extended-message ID the peer assigned to an extension.
    pub fn extension_id(&self, name: &str) -> Option<u8> {
        self.extensions.get(name).copied()
    }
}
