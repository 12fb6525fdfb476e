use std::net::{Ipv4Addr, SocketAddrV4};

/// A parsed tracker announce response.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    /// Seconds the tracker asks us to wait before re-announcing. Parsed for
    /// completeness; there is no re-announce loop.
    pub interval: Option<i64>,
    /// Peers from the compact `peers` byte string, in tracker order.
    pub peers: Vec<SocketAddrV4>,
}

/// Splits a compact peer byte string into socket addresses.
///
/// Each peer is 6 bytes: 4 IPv4 octets followed by a big-endian port.
pub fn parse_compact_peers(data: &[u8]) -> Vec<SocketAddrV4> {
    data.chunks_exact(6)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddrV4::new(ip, port)
        })
        .collect()
}
