//! End-to-end peer session tests against a scripted peer on a local socket.

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use lodestone::metainfo::{Info, InfoHash};
use lodestone::peer::{
    download_piece, fetch_metadata, Handshake, Message, PeerConnection, PeerError, PeerId,
};

const INFO_HASH: [u8; 20] = [7u8; 20];
const SERVER_PEER_ID: [u8; 20] = *b"-XX0001-abcdefghijkl";

fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

async fn read_handshake(socket: &mut TcpStream) -> Handshake {
    let mut buf = [0u8; 68];
    socket.read_exact(&mut buf).await.unwrap();
    Handshake::decode(&buf).unwrap()
}

async fn read_message(socket: &mut TcpStream) -> Message {
    let mut len_buf = [0u8; 4];
    socket.read_exact(&mut len_buf).await.unwrap();
    let len = u32::from_be_bytes(len_buf) as usize;

    let mut frame = Vec::with_capacity(4 + len);
    frame.extend_from_slice(&len_buf);
    frame.resize(4 + len, 0);
    socket.read_exact(&mut frame[4..]).await.unwrap();

    Message::decode(Bytes::from(frame)).unwrap()
}

async fn send_message(socket: &mut TcpStream, message: Message) {
    socket.write_all(&message.encode()).await.unwrap();
}

#[tokio::test]
async fn download_piece_with_out_of_order_blocks() {
    let piece_data: Vec<u8> = (0..40000u32).map(|i| (i % 251) as u8).collect();
    let piece_hash = sha1(&piece_data);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };

    let data = piece_data.clone();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let theirs = read_handshake(&mut socket).await;
        assert_eq!(theirs.info_hash, INFO_HASH);
        assert!(!theirs.supports_extensions());

        let response = Handshake::new(INFO_HASH, SERVER_PEER_ID);
        socket.write_all(&response.encode()).await.unwrap();

        // Noise before the bitfield; the client must drop it.
        send_message(
            &mut socket,
            Message::Unknown {
                id: 4,
                payload: Bytes::from_static(&[0, 0, 0, 0]),
            },
        )
        .await;
        send_message(&mut socket, Message::Bitfield(Bytes::from_static(&[0x80]))).await;

        assert!(matches!(read_message(&mut socket).await, Message::Interested));
        send_message(&mut socket, Message::Unchoke).await;

        // All three requests arrive before any block is served.
        let mut requests = Vec::new();
        for _ in 0..3 {
            match read_message(&mut socket).await {
                Message::Request {
                    index,
                    begin,
                    length,
                } => {
                    assert_eq!(index, 0);
                    requests.push((begin, length));
                }
                other => panic!("expected request, got {:?}", other),
            }
        }
        assert_eq!(requests, vec![(0, 16384), (16384, 16384), (32768, 7232)]);

        // Serve blocks out of order with a keep-alive in between.
        for &(begin, length) in [requests[2], requests[0], requests[1]].iter() {
            send_message(&mut socket, Message::KeepAlive).await;
            let range = begin as usize..(begin + length) as usize;
            send_message(
                &mut socket,
                Message::Piece {
                    index: 0,
                    begin,
                    data: Bytes::copy_from_slice(&data[range]),
                },
            )
            .await;
        }
    });

    let mut conn = PeerConnection::connect(
        addr,
        &InfoHash::from_bytes(INFO_HASH),
        &PeerId::generate(),
        false,
    )
    .await
    .unwrap();

    assert_eq!(conn.peer_id.as_bytes(), &SERVER_PEER_ID);
    assert!(conn.choked);

    conn.prepare_download().await.unwrap();
    assert!(!conn.choked);

    let piece = download_piece(&mut conn, 0, 40000, &piece_hash).await.unwrap();
    assert_eq!(piece.as_ref(), piece_data.as_slice());

    server.await.unwrap();
}

#[tokio::test]
async fn download_piece_hash_mismatch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        read_handshake(&mut socket).await;
        let response = Handshake::new(INFO_HASH, SERVER_PEER_ID);
        socket.write_all(&response.encode()).await.unwrap();

        send_message(&mut socket, Message::Bitfield(Bytes::from_static(&[0x80]))).await;
        assert!(matches!(read_message(&mut socket).await, Message::Interested));
        send_message(&mut socket, Message::Unchoke).await;

        match read_message(&mut socket).await {
            Message::Request { begin, length, .. } => {
                send_message(
                    &mut socket,
                    Message::Piece {
                        index: 0,
                        begin,
                        data: Bytes::from(vec![0u8; length as usize]),
                    },
                )
                .await;
            }
            other => panic!("expected request, got {:?}", other),
        }
    });

    let mut conn = PeerConnection::connect(
        addr,
        &InfoHash::from_bytes(INFO_HASH),
        &PeerId::generate(),
        false,
    )
    .await
    .unwrap();
    conn.prepare_download().await.unwrap();

    let result = download_piece(&mut conn, 0, 100, &[0xde; 20]).await;
    assert!(matches!(result, Err(PeerError::PieceHashMismatch(0))));

    server.await.unwrap();
}

// The full magnet metadata exchange: extension handshake, then ut_metadata
// request/data, then hash verification against the magnet's info hash.
#[tokio::test]
async fn magnet_metadata_exchange() {
    // A bare info dictionary as it would travel over the wire.
    let mut info_bytes = Vec::new();
    info_bytes.extend_from_slice(b"d6:lengthi40000e4:name4:data12:piece lengthi16384e6:pieces60:");
    for i in 0..3u8 {
        info_bytes.extend_from_slice(&[i; 20]);
    }
    info_bytes.push(b'e');

    let info_hash = sha1(&info_bytes);
    let metadata_size = info_bytes.len() as i64;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };

    let metadata = info_bytes.clone();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let theirs = read_handshake(&mut socket).await;
        assert!(theirs.supports_extensions());

        let response = Handshake::with_extensions(info_hash, SERVER_PEER_ID);
        socket.write_all(&response.encode()).await.unwrap();

        // The client's extension handshake advertises ut_metadata as 1.
        match read_message(&mut socket).await {
            Message::Extended { id, payload } => {
                assert_eq!(id, 0);
                assert_eq!(payload.as_ref(), b"d1:md11:ut_metadatai1eee");
            }
            other => panic!("expected extension handshake, got {:?}", other),
        }

        // A bitfield in between must not confuse the handshake wait.
        send_message(&mut socket, Message::Bitfield(Bytes::from_static(&[0xe0]))).await;

        let ext_handshake = format!(
            "d1:md11:ut_metadatai42ee13:metadata_sizei{}ee",
            metadata_size
        );
        send_message(
            &mut socket,
            Message::Extended {
                id: 0,
                payload: Bytes::from(ext_handshake.into_bytes()),
            },
        )
        .await;

        // Metadata request addressed to the id we chose (42).
        match read_message(&mut socket).await {
            Message::Extended { id, payload } => {
                assert_eq!(id, 42);
                assert_eq!(payload.as_ref(), b"d8:msg_typei0e5:piecei0ee");
            }
            other => panic!("expected metadata request, got {:?}", other),
        }

        let mut payload = format!(
            "d8:msg_typei1e5:piecei0e10:total_sizei{}ee",
            metadata.len()
        )
        .into_bytes();
        payload.extend_from_slice(&metadata);
        send_message(
            &mut socket,
            Message::Extended {
                id: 1,
                payload: Bytes::from(payload),
            },
        )
        .await;
    });

    let mut conn = PeerConnection::connect(
        addr,
        &InfoHash::from_bytes(info_hash),
        &PeerId::generate(),
        true,
    )
    .await
    .unwrap();

    let extensions = conn.exchange_extension_handshake().await.unwrap();
    assert_eq!(extensions.extension_id("ut_metadata"), Some(42));
    assert_eq!(extensions.metadata_size, Some(metadata_size));

    let metadata = fetch_metadata(&mut conn, &InfoHash::from_bytes(info_hash))
        .await
        .unwrap();
    assert_eq!(metadata.as_ref(), info_bytes.as_slice());

    let info = Info::from_bytes(&metadata).unwrap();
    assert_eq!(info.length, 40000);
    assert_eq!(info.piece_count(), 3);

    server.await.unwrap();
}

#[tokio::test]
async fn magnet_metadata_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        read_handshake(&mut socket).await;
        let response = Handshake::with_extensions(INFO_HASH, SERVER_PEER_ID);
        socket.write_all(&response.encode()).await.unwrap();

        read_message(&mut socket).await; // client's extension handshake
        send_message(
            &mut socket,
            Message::Extended {
                id: 0,
                payload: Bytes::from_static(
                    b"d1:md11:ut_metadatai2ee13:metadata_sizei100ee",
                ),
            },
        )
        .await;

        read_message(&mut socket).await; // metadata request
        send_message(
            &mut socket,
            Message::Extended {
                id: 1,
                payload: Bytes::from_static(b"d8:msg_typei2e5:piecei0ee"),
            },
        )
        .await;
    });

    let mut conn = PeerConnection::connect(
        addr,
        &InfoHash::from_bytes(INFO_HASH),
        &PeerId::generate(),
        true,
    )
    .await
    .unwrap();
    conn.exchange_extension_handshake().await.unwrap();

    let result = fetch_metadata(&mut conn, &InfoHash::from_bytes(INFO_HASH)).await;
    assert!(matches!(result, Err(PeerError::MetadataRejected)));

    server.await.unwrap();
}

#[tokio::test]
async fn handshake_info_hash_mismatch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_handshake(&mut socket).await;

        // Echo a handshake for a different torrent.
        let response = Handshake::new([9u8; 20], SERVER_PEER_ID);
        socket.write_all(&response.encode()).await.unwrap();
    });

    let result = PeerConnection::connect(
        addr,
        &InfoHash::from_bytes(INFO_HASH),
        &PeerId::generate(),
        false,
    )
    .await;
    assert!(matches!(result, Err(PeerError::InfoHashMismatch)));

    server.await.unwrap();
}
