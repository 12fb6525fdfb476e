//! High-level download flows.
//!
//! Every CLI subcommand that touches the network composes the same few
//! steps: announce, connect to the first peer, run the pre-download
//! prelude, move data. [`Client`] holds the process-wide peer ID and
//! provides those steps exactly once.

use std::net::SocketAddrV4;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::constants::{DEFAULT_PORT, MAGNET_LEFT_PLACEHOLDER};
use crate::metainfo::{Info, InfoHash, MagnetLink, Metainfo, MetainfoError};
use crate::peer::{download_piece, fetch_metadata, PeerConnection, PeerError, PeerId};
use crate::tracker::{HttpTracker, TrackerError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Metainfo(#[from] MetainfoError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("tracker returned no peers")]
    NoPeers,

    #[error("magnet link has no tracker and no peer address")]
    NoPeerSource,

    #[error("piece index {0} out of range")]
    InvalidPieceIndex(u32),
}

/// A BitTorrent client: one peer ID, one peer connection per download.
///
/// # Examples
///
/// ```no_run
/// use lodestone::client::Client;
/// use lodestone::metainfo::Metainfo;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let data = std::fs::read("example.torrent")?;
/// let metainfo = Metainfo::from_bytes(&data)?;
///
/// let client = Client::new();
/// let mut conn = client.connect(&metainfo).await?;
/// conn.prepare_download().await?;
/// let file = client.download(&mut conn, &metainfo.info).await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    peer_id: PeerId,
}

impl Client {
    pub fn new() -> Self {
        Self {
            peer_id: PeerId::generate(),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Announces to the tracker and returns the compact peer list in the
    /// order the tracker declared it.
    pub async fn announce(
        &self,
        announce_url: &str,
        info_hash: &InfoHash,
        left: u64,
    ) -> Result<Vec<SocketAddrV4>, ClientError> {
        let tracker = HttpTracker::new(announce_url)?;
        let response = tracker
            .announce(info_hash, &self.peer_id, DEFAULT_PORT, 0, 0, left)
            .await?;

        info!(peers = response.peers.len(), "tracker announce complete");
        Ok(response.peers)
    }

    /// Connects to the first tracker-provided peer for a torrent file
    /// download. No extension bit; the info dictionary is already in hand.
    pub async fn connect(&self, metainfo: &Metainfo) -> Result<PeerConnection, ClientError> {
        let peers = self
            .announce(&metainfo.announce, &metainfo.info_hash, metainfo.info.length)
            .await?;
        let addr = *peers.first().ok_or(ClientError::NoPeers)?;

        let conn = PeerConnection::connect(addr, &metainfo.info_hash, &self.peer_id, false).await?;
        Ok(conn)
    }

    /// Connects to a peer for a magnet download and runs the extension
    /// handshake.
    ///
    /// The seed peer from `x.pe` is preferred; otherwise the tracker is
    /// announced with a placeholder `left`, since the real length is not
    /// known until the metadata arrives.
    pub async fn connect_magnet(&self, magnet: &MagnetLink) -> Result<PeerConnection, ClientError> {
        let addr = match magnet.peer_addr()? {
            Some(addr) => addr,
            None => {
                let tracker = magnet.tracker.as_deref().ok_or(ClientError::NoPeerSource)?;
                let peers = self
                    .announce(tracker, &magnet.info_hash, MAGNET_LEFT_PLACEHOLDER)
                    .await?;
                *peers.first().ok_or(ClientError::NoPeers)?
            }
        };

        let mut conn =
            PeerConnection::connect(addr, &magnet.info_hash, &self.peer_id, true).await?;
        conn.exchange_extension_handshake().await?;
        Ok(conn)
    }

    /// Fetches and verifies the info dictionary over an established magnet
    /// session. Afterwards the session is used exactly like a file-backed
    /// one.
    pub async fn fetch_magnet_info(
        &self,
        conn: &mut PeerConnection,
        magnet: &MagnetLink,
    ) -> Result<Info, ClientError> {
        let metadata = fetch_metadata(conn, &magnet.info_hash).await?;
        let info = Info::from_bytes(&metadata)?;
        info!(
            length = info.length,
            pieces = info.piece_count(),
            "metadata fetched and verified"
        );
        Ok(info)
    }

    /// Downloads and verifies a single piece over an unchoked session.
    pub async fn download_piece(
        &self,
        conn: &mut PeerConnection,
        info: &Info,
        index: u32,
    ) -> Result<Bytes, ClientError> {
        if index as usize >= info.piece_count() {
            return Err(ClientError::InvalidPieceIndex(index));
        }

        let piece = download_piece(
            conn,
            index,
            info.piece_size(index) as u32,
            info.piece_hash(index),
        )
        .await?;
        Ok(piece)
    }

    /// Downloads the whole file, piece by piece in order, over a single
    /// unchoked session.
    pub async fn download(
        &self,
        conn: &mut PeerConnection,
        info: &Info,
    ) -> Result<Vec<u8>, ClientError> {
        let mut file = Vec::with_capacity(info.length as usize);

        for index in 0..info.piece_count() as u32 {
            let piece = self.download_piece(conn, info, index).await?;
            file.extend_from_slice(&piece);
        }

        Ok(file)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
