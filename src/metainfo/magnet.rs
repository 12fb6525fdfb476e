use std::net::SocketAddrV4;

use super::error::MetainfoError;
use super::info_hash::InfoHash;

/// A parsed magnet link ([BEP-9]).
///
/// Magnet links carry a torrent's identity without the torrent file itself;
/// the info dictionary is fetched from peers via the metadata extension.
///
/// # Format
///
/// ```text
/// magnet:?xt=urn:btih:<40-hex info hash>&tr=<tracker>&x.pe=<ip:port>
/// ```
///
/// # Examples
///
/// ```
/// use lodestone::metainfo::MagnetLink;
///
/// let uri = "magnet:?xt=urn:btih:ad42ce8109f54c99613ce38f9b4d87e70f24a165\
///            &tr=http%3A%2F%2Fexample%2Fannounce";
///
/// let magnet = MagnetLink::parse(uri).unwrap();
/// assert_eq!(magnet.info_hash.to_hex(), "ad42ce8109f54c99613ce38f9b4d87e70f24a165");
/// assert_eq!(magnet.tracker.as_deref(), Some("http://example/announce"));
/// assert!(magnet.peer.is_none());
/// ```
///
/// [BEP-9]: http://bittorrent.org/beps/bep_0009.html
#[derive(Debug, Clone)]
pub struct MagnetLink {
    /// The torrent's info hash (required).
    pub info_hash: InfoHash,
    /// Tracker URL from the `tr` parameter, percent-decoded.
    pub tracker: Option<String>,
    /// Seed peer address from the `x.pe` parameter, kept as `ip:port` text.
    pub peer: Option<String>,
}

impl MagnetLink {
    /// Parses a magnet URI.
    ///
    /// Recognized parameters:
    ///
    /// - `xt` - exact topic, required; must be `urn:btih:` followed by a
    ///   40-character hex info hash
    /// - `tr` - tracker URL (percent-encoded); the first occurrence wins
    /// - `x.pe` - a seed peer as `ip:port`
    ///
    /// Other parameters (`dn`, ...) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MetainfoError::InvalidMagnetLink`] if the `magnet:?` prefix
    /// or the `xt` parameter is missing, or the info hash is malformed.
    pub fn parse(uri: &str) -> Result<Self, MetainfoError> {
        let query = uri
            .strip_prefix("magnet:?")
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing magnet:? prefix".into()))?;

        let mut info_hash = None;
        let mut tracker = None;
        let mut peer = None;

        for param in query.split('&') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };

            match key {
                "xt" => {
                    let hex = value.strip_prefix("urn:btih:").ok_or_else(|| {
                        MetainfoError::InvalidMagnetLink("unsupported xt format".into())
                    })?;
                    let hash = InfoHash::from_hex(hex).map_err(|_| {
                        MetainfoError::InvalidMagnetLink("invalid info hash".into())
                    })?;
                    info_hash = Some(hash);
                }
                "tr" if tracker.is_none() => tracker = Some(percent_decode(value)),
                "x.pe" if peer.is_none() => peer = Some(value.to_string()),
                _ => {}
            }
        }

        let info_hash = info_hash
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing xt parameter".into()))?;

        Ok(Self {
            info_hash,
            tracker,
            peer,
        })
    }

    /// Parses the `x.pe` seed peer into a socket address, if present.
    pub fn peer_addr(&self) -> Result<Option<SocketAddrV4>, MetainfoError> {
        match &self.peer {
            None => Ok(None),
            Some(text) => text
                .parse()
                .map(Some)
                .map_err(|_| MetainfoError::InvalidMagnetLink(format!("bad peer address: {text}"))),
        }
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
