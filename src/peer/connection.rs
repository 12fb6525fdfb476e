use std::net::SocketAddrV4;

use tokio::net::TcpStream;
use tracing::debug;

use super::error::PeerError;
use super::extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID};
use super::message::{Handshake, Message};
use super::peer_id::PeerId;
use super::transport::PeerTransport;

/// A live session with a single peer.
///
/// One connection carries one download from handshake to completion. The
/// session owns the socket; piece and metadata transfers borrow the whole
/// session for their duration, so messages are always processed in arrival
/// order.
///
/// # Examples
///
/// ```no_run
/// use lodestone::metainfo::InfoHash;
/// use lodestone::peer::{PeerConnection, PeerId};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let addr = "127.0.0.1:6881".parse()?;
/// let mut conn =
///     PeerConnection::connect(addr, &InfoHash([0u8; 20]), &PeerId::generate(), false).await?;
/// conn.prepare_download().await?;
/// # Ok(())
/// # }
/// ```
pub struct PeerConnection {
    /// The peer's address.
    pub addr: SocketAddrV4,
    /// The peer's ID from its handshake.
    pub peer_id: PeerId,
    /// Whether the peer set the extension bit in its handshake.
    pub supports_extensions: bool,
    /// Whether the peer is currently choking us.
    pub choked: bool,
    extensions: Option<ExtensionHandshake>,
    transport: PeerTransport,
}

impl PeerConnection {
    /// Opens a TCP connection and exchanges handshakes.
    ///
    /// `advertise_extensions` sets the BEP-10 bit in our reserved bytes;
    /// the magnet flow needs it, plain torrent downloads do not.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::HandshakeRejected`] if the peer's protocol
    /// string is wrong and [`PeerError::InfoHashMismatch`] if it echoes a
    /// different torrent.
    pub async fn connect(
        addr: SocketAddrV4,
        info_hash: &crate::metainfo::InfoHash,
        our_peer_id: &PeerId,
        advertise_extensions: bool,
    ) -> Result<Self, PeerError> {
        let stream = TcpStream::connect(addr).await?;
        let mut transport = PeerTransport::new(stream);

        let handshake = if advertise_extensions {
            Handshake::with_extensions(*info_hash.as_bytes(), *our_peer_id.as_bytes())
        } else {
            Handshake::new(*info_hash.as_bytes(), *our_peer_id.as_bytes())
        };
        transport.send_handshake(&handshake).await?;

        let theirs = transport.receive_handshake().await?;

        if theirs.info_hash != *info_hash.as_bytes() {
            return Err(PeerError::InfoHashMismatch);
        }

        let peer_id = PeerId(theirs.peer_id);
        debug!(peer = %addr, id = %peer_id, "handshake complete");

        Ok(Self {
            addr,
            peer_id,
            supports_extensions: theirs.supports_extensions(),
            choked: true,
            extensions: None,
            transport,
        })
    }

    /// Sends a message to the peer.
    pub async fn send(&mut self, message: Message) -> Result<(), PeerError> {
        self.transport.send_message(&message).await
    }

    /// Receives the next message, tracking choke state.
    pub async fn receive(&mut self) -> Result<Message, PeerError> {
        let message = self.transport.receive_message().await?;

        match &message {
            Message::Choke => self.choked = true,
            Message::Unchoke => self.choked = false,
            _ => {}
        }

        Ok(message)
    }

    /// Performs the BEP-10 extension handshake.
    ///
    /// Sends our handshake advertising `ut_metadata`, then reads until the
    /// peer's extension handshake arrives, discarding bitfields and any
    /// other traffic in between. The peer's `m` map and `metadata_size`
    /// are retained on the session.
    ///
    /// # Errors
    ///
    /// [`PeerError::ExtensionsNotSupported`] if the peer did not set the
    /// extension bit.
    pub async fn exchange_extension_handshake(
        &mut self,
    ) -> Result<&ExtensionHandshake, PeerError> {
        if !self.supports_extensions {
            return Err(PeerError::ExtensionsNotSupported);
        }

        self.send(Message::Extended {
            id: EXTENSION_HANDSHAKE_ID,
            payload: ExtensionHandshake::ours().encode(),
        })
        .await?;

        loop {
            if let Message::Extended { id, payload } = self.receive().await? {
                if id == EXTENSION_HANDSHAKE_ID {
                    let theirs = ExtensionHandshake::decode(&payload)?;
                    debug!(
                        peer = %self.addr,
                        extensions = ?theirs.extensions,
                        metadata_size = ?theirs.metadata_size,
                        "extension handshake complete"
                    );
                    return Ok(self.extensions.insert(theirs));
                }
            }
        }
    }

    /// Runs the pre-download prelude: wait for the peer's bitfield (which
    /// this client discards), declare interest, and wait to be unchoked.
    ///
    /// Anything else the peer sends during this window is silently dropped.
    pub async fn prepare_download(&mut self) -> Result<(), PeerError> {
        loop {
            if let Message::Bitfield(_) = self.receive().await? {
                break;
            }
        }

        self.send(Message::Interested).await?;

        while self.choked {
            self.receive().await?;
        }

        debug!(peer = %self.addr, "unchoked, ready to request pieces");
        Ok(())
    }

    /// The peer's extension handshake, once
    /// [`exchange_extension_handshake`](Self::exchange_extension_handshake)
    /// has run.
    pub fn extensions(&self) -> Option<&ExtensionHandshake> {
        self.extensions.as_ref()
    }

    /// The extended-message ID the peer wants us to use for `ut_metadata`.
    pub fn metadata_extension_id(&self) -> Option<u8> {
        self.extensions.as_ref()?.extension_id("ut_metadata")
    }

    /// The metadata size the peer reported in its extension handshake.
    pub fn metadata_size(&self) -> Option<i64> {
        self.extensions.as_ref()?.metadata_size
    }
}
