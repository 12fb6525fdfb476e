//! Pipelined piece download.

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tracing::debug;

use super::connection::PeerConnection;
use super::error::PeerError;
use super::message::Message;
use crate::constants::BLOCK_SIZE;

/// Downloads and verifies one piece over an unchoked session.
///
/// The piece is split into 16KB blocks and every request is sent before any
/// response is read; the peer may answer in any order, so blocks are placed
/// by their `begin` offset. Completion is tracked by counting distinct
/// blocks rather than tallying bytes, so a zero-length final block cannot
/// wedge the loop. Non-piece traffic received in the meantime is discarded.
///
/// # Errors
///
/// Returns [`PeerError::PieceHashMismatch`] when the reassembled piece does
/// not hash to `expected_hash`.
pub async fn download_piece(
    conn: &mut PeerConnection,
    index: u32,
    piece_length: u32,
    expected_hash: &[u8; 20],
) -> Result<Bytes, PeerError> {
    let block_count = piece_length.div_ceil(BLOCK_SIZE);
    let mut piece = vec![0u8; piece_length as usize];

    for block in 0..block_count {
        let begin = block * BLOCK_SIZE;
        let length = BLOCK_SIZE.min(piece_length - begin);
        conn.send(Message::Request {
            index,
            begin,
            length,
        })
        .await?;
    }

    let mut received = vec![false; block_count as usize];
    let mut blocks_received = 0u32;

    while blocks_received < block_count {
        let Message::Piece {
            index: piece_index,
            begin,
            data,
        } = conn.receive().await?
        else {
            continue;
        };

        if piece_index != index {
            continue;
        }

        if begin % BLOCK_SIZE != 0 {
            return Err(PeerError::InvalidMessage("block at unaligned offset"));
        }

        let end = begin as usize + data.len();
        if end > piece.len() {
            return Err(PeerError::InvalidMessage("block past end of piece"));
        }

        piece[begin as usize..end].copy_from_slice(&data);

        let block = (begin / BLOCK_SIZE) as usize;
        if !received[block] {
            received[block] = true;
            blocks_received += 1;
        }
    }

    let mut hasher = Sha1::new();
    hasher.update(&piece);
    let digest: [u8; 20] = hasher.finalize().into();

    if digest != *expected_hash {
        return Err(PeerError::PieceHashMismatch(index));
    }

    debug!(piece = index, bytes = piece.len(), "piece verified");
    Ok(Bytes::from(piece))
}
