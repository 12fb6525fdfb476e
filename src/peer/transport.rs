use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::error::PeerError;
use super::message::{Handshake, Message, HANDSHAKE_LEN};
use crate::constants::{MAX_MESSAGE_SIZE, PEER_READ_TIMEOUT, PEER_WRITE_TIMEOUT};

/// Framed I/O over a peer's TCP stream.
///
/// All session suspension happens here: reads loop until a complete frame
/// has arrived or the peer closes, and both directions carry a timeout that
/// poisons the connection when tripped.
pub struct PeerTransport {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl PeerTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(32 * 1024),
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        let data = handshake.encode();
        timeout(PEER_WRITE_TIMEOUT, self.stream.write_all(&data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        self.fill_buf(HANDSHAKE_LEN).await?;
        let data = self.read_buf.split_to(HANDSHAKE_LEN);
        Handshake::decode(&data)
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        let data = message.encode();
        timeout(PEER_WRITE_TIMEOUT, self.stream.write_all(&data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        self.fill_buf(4).await?;

        let length = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if length > MAX_MESSAGE_SIZE {
            return Err(PeerError::InvalidMessage("message too large"));
        }

        self.fill_buf(4 + length).await?;
        let data = self.read_buf.split_to(4 + length);
        Message::decode(data.freeze())
    }

    // Reads from the socket until at least `needed` buffered bytes exist.
    async fn fill_buf(&mut self, needed: usize) -> Result<(), PeerError> {
        while self.read_buf.len() < needed {
            let n = timeout(PEER_READ_TIMEOUT, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| PeerError::Timeout)??;

            if n == 0 {
                return Err(PeerError::ConnectionClosed);
            }
        }
        Ok(())
    }
}
