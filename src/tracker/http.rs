use reqwest::Client;

use super::error::TrackerError;
use super::response::{parse_compact_peers, AnnounceResponse};
use crate::bencode::decode;
use crate::constants::HTTP_TRACKER_TIMEOUT;
use crate::metainfo::InfoHash;
use crate::peer::PeerId;

/// An HTTP tracker client ([BEP-3]).
///
/// Announces the client's presence for a torrent and retrieves the compact
/// peer list from the response.
///
/// # Examples
///
/// ```no_run
/// use lodestone::metainfo::InfoHash;
/// use lodestone::peer::PeerId;
/// use lodestone::tracker::HttpTracker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = HttpTracker::new("http://tracker.example.com/announce")?;
/// let response = tracker
///     .announce(&InfoHash([0u8; 20]), &PeerId::generate(), 6881, 0, 0, 1000)
///     .await?;
///
/// println!("Found {} peers", response.peers.len());
/// # Ok(())
/// # }
/// ```
///
/// [BEP-3]: http://bittorrent.org/beps/bep_0003.html
pub struct HttpTracker {
    client: Client,
    url: String,
}

impl HttpTracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(HTTP_TRACKER_TIMEOUT)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Sends an announce request and parses the compact peer list.
    ///
    /// `compact=1` is always requested; non-compact responses are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Failure`] when the tracker answers with a
    /// `failure reason`, and [`TrackerError::InvalidResponse`] when the body
    /// is not the expected bencoded shape.
    pub async fn announce(
        &self,
        info_hash: &InfoHash,
        peer_id: &PeerId,
        port: u16,
        uploaded: u64,
        downloaded: u64,
        left: u64,
    ) -> Result<AnnounceResponse, TrackerError> {
        let url = format!(
            "{}?info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            self.url,
            url_encode(info_hash.as_bytes()),
            url_encode(peer_id.as_bytes()),
            port,
            uploaded,
            downloaded,
            left
        );

        tracing::debug!(url = %self.url, "announcing to tracker");

        let response = self.client.get(&url).send().await?;
        let body = response.bytes().await?;

        parse_announce_response(&body)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub(super) fn parse_announce_response(body: &[u8]) -> Result<AnnounceResponse, TrackerError> {
    let value = decode(body)?;
    let dict = value
        .as_dict()
        .ok_or(TrackerError::InvalidResponse("expected dict"))?;

    if let Some(failure) = dict
        .get(b"failure reason".as_slice())
        .and_then(|v| v.as_str())
    {
        return Err(TrackerError::Failure(failure.to_string()));
    }

    let interval = dict
        .get(b"interval".as_slice())
        .and_then(|v| v.as_integer());

    let peers_bytes = dict
        .get(b"peers".as_slice())
        .and_then(|v| v.as_bytes())
        .ok_or(TrackerError::InvalidResponse("missing compact peers"))?;

    if peers_bytes.len() % 6 != 0 {
        return Err(TrackerError::InvalidResponse(
            "compact peers not a multiple of 6 bytes",
        ));
    }

    Ok(AnnounceResponse {
        interval,
        peers: parse_compact_peers(peers_bytes),
    })
}

/// Percent-encodes raw bytes for a tracker announce URL.
///
/// Unreserved ASCII (`A-Z a-z 0-9 - _ . ~`) passes through; every other
/// byte becomes `%HH` with uppercase hex.
pub fn url_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::new(), |mut s, &b| {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.' || b == b'~' {
            s.push(b as char);
        } else {
            let _ = write!(s, "%{:02X}", b);
        }
        s
    })
}
