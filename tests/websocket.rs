//! End-to-end tests over a real WebSocket connection.

use driftboard::{server, Board, BoardConfig, ServerEvent};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    board: Arc<Board>,
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
    _dir: TempDir,
}

async fn start_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>driftboard</h1>").unwrap();

    let board = Arc::new(
        Board::open(BoardConfig {
            snapshot_path: dir.path().join("messages.json"),
            static_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(server::serve(listener, Arc::clone(&board), async {
        let _ = shutdown_rx.await;
    }));

    TestServer {
        board,
        addr,
        _shutdown: shutdown_tx,
        _dir: dir,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{}{}", addr, server::SOCKET_PATH);
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn next_event(client: &mut Client) -> ServerEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .unwrap();
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn publish(client: &mut Client, content: serde_json::Value) {
    let frame = json!({"event": "chat message", "data": content}).to_string();
    client.send(WsMessage::Text(frame)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connect_replays_then_broadcasts() {
    let server = start_server().await;
    let seed = server.board.hub().subscribe().unwrap();
    let earlier = server.board.hub().publish(seed.id, json!("before anyone"));

    let mut alice = connect(server.addr).await;
    let mut bob = connect(server.addr).await;

    assert_eq!(
        next_event(&mut alice).await,
        ServerEvent::LoadMessages(vec![earlier.clone()])
    );
    assert_eq!(
        next_event(&mut bob).await,
        ServerEvent::LoadMessages(vec![earlier])
    );

    publish(&mut alice, json!({"text": "hi bob"})).await;

    let to_alice = next_event(&mut alice).await;
    let to_bob = next_event(&mut bob).await;
    assert_eq!(to_alice, to_bob);
    match to_bob {
        ServerEvent::ChatMessage(message) => assert_eq!(message.content, json!({"text": "hi bob"})),
        other => panic!("Expected ChatMessage, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_frames_are_ignored() {
    let server = start_server().await;
    let mut client = connect(server.addr).await;
    next_event(&mut client).await;

    client
        .send(WsMessage::Text("not json".to_string()))
        .await
        .unwrap();
    client
        .send(WsMessage::Text(r#"{"event":"typing","data":true}"#.to_string()))
        .await
        .unwrap();
    publish(&mut client, json!(42)).await;

    match next_event(&mut client).await {
        ServerEvent::ChatMessage(message) => assert_eq!(message.content, json!(42)),
        other => panic!("Expected ChatMessage, got {:?}", other),
    }
    assert_eq!(server.board.ledger().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_closing_socket_disconnects_session() {
    let server = start_server().await;
    let mut client = connect(server.addr).await;
    next_event(&mut client).await;
    assert_eq!(server.board.hub().session_count(), 1);

    client.close(None).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while server.board.hub().session_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.board.hub().session_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serves_index_html() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nUser-Agent: test Mobile\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("<h1>driftboard</h1>"));
}
