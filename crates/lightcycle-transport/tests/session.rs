//! Integration tests for the TCP session.
//!
//! Every test runs a real loopback connection against [`StubServer`], so
//! framing, the handshake and the background receive loop are exercised
//! end to end.

use std::time::Duration;

use futures_util::StreamExt;
use lightcycle_protocol::{Chat, LobbyPlayer, Message, PlayerColor, Ready, Tick};
use lightcycle_transport::{
    DEFAULT_CONNECT_TIMEOUT, HandshakeRequest, Session, StubPeer, StubServer, TransportError,
};
use tokio::task::JoinHandle;

/// Binds a stub with one other player and starts accepting in the
/// background.
async fn start_stub() -> (u16, String, JoinHandle<StubPeer>) {
    let stub = StubServer::bind("#FF0000", vec![LobbyPlayer::new("#00FF00", "Zold", true)])
        .await
        .expect("stub should bind");
    let port = stub.port();
    let group_id = stub.group_id().to_string();
    let handle = tokio::spawn(async move { stub.accept().await.expect("stub should accept") });
    (port, group_id, handle)
}

/// Connects, performs the handshake and returns both ends.
async fn connected_pair() -> (Session, StubPeer) {
    let (port, _, handle) = start_stub().await;
    let mut session = Session::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
        .await
        .expect("should connect");
    session
        .handshake(&HandshakeRequest::new("Buddy"))
        .await
        .expect("handshake should succeed");
    let peer = handle.await.expect("accept task should complete");
    (session, peer)
}

fn chat(text: &str, color: &str) -> Message {
    Message::Chat(Chat {
        message: text.into(),
        color: PlayerColor::new(color),
    })
}

#[tokio::test]
async fn test_handshake_returns_color_and_roster() {
    let (port, group_id, handle) = start_stub().await;
    let mut session = Session::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
        .await
        .expect("should connect");

    let resp = session
        .handshake(&HandshakeRequest::new("Buddy"))
        .await
        .expect("handshake should succeed");

    assert_eq!(resp.color, PlayerColor::new("#FF0000"));
    assert_eq!(resp.players, vec![LobbyPlayer::new("#00FF00", "Zold", true)]);
    assert_eq!(resp.group_id, group_id);
    assert_eq!(group_id.len(), 16);

    let peer = handle.await.unwrap();
    let req = peer.request().expect("stub should record the request");
    assert_eq!(req.name, "Buddy");
    assert_eq!(req.privacy, "private");
    assert_eq!(req.group_id, None);
}

#[tokio::test]
async fn test_send_delivers_one_message_per_line() {
    let (mut session, mut peer) = connected_pair().await;

    session
        .send(&Message::Ready(Ready {
            value: true,
            color: None,
        }))
        .await
        .unwrap();
    session.send(&chat("gl hf", "#FF0000")).await.unwrap();

    assert_eq!(
        peer.recv().await.unwrap(),
        Some(Message::Ready(Ready {
            value: true,
            color: None,
        }))
    );
    assert_eq!(peer.recv().await.unwrap(), Some(chat("gl hf", "#FF0000")));
}

#[tokio::test]
async fn test_receive_stream_skips_undecodable_lines() {
    let (mut session, mut peer) = connected_pair().await;
    let mut stream = session.receive_stream().unwrap();

    peer.send_raw("this is not json").await.unwrap();
    peer.send_raw(r#"{"message":"no type here"}"#).await.unwrap();
    peer.send_raw(r#"{"type":"error"}"#).await.unwrap();
    peer.send_raw("").await.unwrap();
    peer.send(&chat("still here", "#00FF00")).await.unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("should not hang");
    assert_eq!(msg, Some(chat("still here", "#00FF00")));
}

#[tokio::test]
async fn test_receive_stream_skips_non_utf8_line() {
    let (mut session, mut peer) = connected_pair().await;
    let mut stream = session.receive_stream().unwrap();

    peer.send_bytes(b"\xff\xfe{\"type\":\"chat\"}").await.unwrap();
    peer.send(&Message::StartGame).await.unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("should not hang");
    assert_eq!(msg, Some(Message::StartGame));
}

#[tokio::test]
async fn test_receive_stream_ends_when_peer_closes() {
    let (mut session, mut peer) = connected_pair().await;
    let mut stream = session.receive_stream().unwrap();

    peer.send(&Message::StartGame).await.unwrap();
    peer.close().await;

    // Works as a futures Stream too.
    assert_eq!(stream.next().await, Some(Message::StartGame));
    let end = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("should not hang");
    assert_eq!(end, None);
}

#[tokio::test]
async fn test_reclaim_keeps_unread_messages_for_next_stream() {
    let (mut session, mut peer) = connected_pair().await;
    let mut lobby_stream = session.receive_stream().unwrap();

    let tick = Message::Tick(Tick {
        countdown: 3,
        ..Tick::default()
    });
    peer.send(&Message::StartGame).await.unwrap();
    peer.send(&tick).await.unwrap();

    assert_eq!(lobby_stream.recv().await, Some(Message::StartGame));
    session.reclaim(lobby_stream).await;

    let mut game_stream = session.receive_stream().expect("reader should be idle again");
    assert_eq!(game_stream.recv().await, Some(tick));

    peer.send(&chat("after", "#00FF00")).await.unwrap();
    assert_eq!(game_stream.recv().await, Some(chat("after", "#00FF00")));
}

#[tokio::test]
async fn test_receive_stream_twice_is_reader_busy() {
    let (mut session, _peer) = connected_pair().await;
    let _stream = session.receive_stream().unwrap();

    assert!(matches!(
        session.receive_stream(),
        Err(TransportError::ReaderBusy)
    ));
    assert!(matches!(
        session.handshake(&HandshakeRequest::new("Again")).await,
        Err(TransportError::ReaderBusy)
    ));
}

#[tokio::test]
async fn test_send_after_close_is_not_connected() {
    let (mut session, _peer) = connected_pair().await;
    assert!(session.is_open());

    session.close().await;
    session.close().await;

    assert!(!session.is_open());
    let err = session.send(&chat("hello?", "#FF0000")).await.unwrap_err();
    assert!(matches!(err, TransportError::NotConnected));
    assert!(matches!(
        session.receive_stream(),
        Err(TransportError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_handshake_times_out_without_response() {
    let stub = StubServer::bind("#FF0000", Vec::new()).await.unwrap();
    let port = stub.port();
    let handle = tokio::spawn(async move { stub.accept_without_reply().await.unwrap() });

    let mut session = Session::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
        .await
        .unwrap();
    let mut request = HandshakeRequest::new("Buddy");
    request.timeout = Duration::from_millis(100);

    let err = session.handshake(&request).await.unwrap_err();
    assert!(matches!(err, TransportError::HandshakeTimeout));

    // The stub did get the request.
    let peer = handle.await.unwrap();
    assert_eq!(peer.request().map(|r| r.name.as_str()), Some("Buddy"));
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let stub = StubServer::bind("#FF0000", Vec::new()).await.unwrap();
    let port = stub.port();
    drop(stub);

    let err = Session::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
        .await
        .unwrap_err();
    match err {
        TransportError::ConnectFailed { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{port}")),
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
}
