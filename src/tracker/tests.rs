use super::http::parse_announce_response;
use super::*;

#[test]
fn test_url_encode_unreserved_passthrough() {
    assert_eq!(url_encode(b"AZaz09-_.~"), "AZaz09-_.~");
}

#[test]
fn test_url_encode_uppercase_hex() {
    assert_eq!(url_encode(&[0x00, 0xab, 0xff]), "%00%AB%FF");
    assert_eq!(url_encode(b" /"), "%20%2F");
}

#[test]
fn test_parse_compact_peers() {
    let data = [
        192, 168, 1, 1, 0x1A, 0xE1, // 192.168.1.1:6881
        10, 0, 0, 1, 0xC8, 0xD5, // 10.0.0.1:51413
    ];

    let peers = parse_compact_peers(&data);
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0].ip().octets(), [192, 168, 1, 1]);
    assert_eq!(peers[0].port(), 6881);
    assert_eq!(peers[1].port(), 51413);
}

#[test]
fn test_parse_announce_response() {
    let mut body = Vec::new();
    body.extend_from_slice(b"d8:intervali1800e5:peers12:");
    body.extend_from_slice(&[192, 168, 1, 1, 0x1A, 0xE1, 10, 0, 0, 1, 0x1A, 0xE2]);
    body.push(b'e');

    let response = parse_announce_response(&body).unwrap();
    assert_eq!(response.interval, Some(1800));
    assert_eq!(response.peers.len(), 2);
    assert_eq!(response.peers[1].port(), 6882);
}

#[test]
fn test_parse_announce_failure_reason() {
    let body = b"d14:failure reason15:torrent unknowne";
    match parse_announce_response(body) {
        Err(TrackerError::Failure(reason)) => assert_eq!(reason, "torrent unknown"),
        other => panic!("expected failure, got {:?}", other.map(|r| r.peers)),
    }
}

#[test]
fn test_parse_announce_ragged_peers_rejected() {
    let mut body = Vec::new();
    body.extend_from_slice(b"d5:peers7:");
    body.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7]);
    body.push(b'e');

    assert!(matches!(
        parse_announce_response(&body),
        Err(TrackerError::InvalidResponse(_))
    ));
}

#[test]
fn test_http_tracker_invalid_url() {
    assert!(HttpTracker::new("udp://tracker.example.com:80").is_err());
    assert!(HttpTracker::new("http://tracker.example.com/announce").is_ok());
}
