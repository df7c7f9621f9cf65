//! Test fixtures for integration tests.
//!
//! Starts the relay in-process on an ephemeral port and provides helpers to
//! drive real peers against it.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};

use futures_util::StreamExt;
use kakurega_client::{PeerClient, PeerEvent, PeerSession};
use kakurega_server::{
    ServerConfig, ServerError,
    infrastructure::dto::websocket::{CODE_OK, Frame, JoinRoomFrame},
    serve,
};
use kakurega_shared::KeyPair;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const TEST_KEY_BITS: usize = 1024;
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(200);
const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Relay running inside the test's runtime; shut down on drop
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let config = ServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            sweep_interval: SWEEP_INTERVAL,
            room_key_bits: TEST_KEY_BITS,
            ..ServerConfig::default()
        };

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, config, async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

/// One key pair reused by every test peer
pub fn peer_keys() -> KeyPair {
    static KEYS: OnceLock<Arc<KeyPair>> = OnceLock::new();
    KEYS.get_or_init(|| Arc::new(KeyPair::generate(TEST_KEY_BITS).expect("key generation")))
        .as_ref()
        .clone()
}

/// Connect and send the join request without waiting for the reply
pub async fn connect_peer(server: &TestServer, username: &str, room: &str) -> PeerClient {
    let session = PeerSession::new(username, room, peer_keys());
    PeerClient::join(&server.ws_url(), session)
        .await
        .expect("Failed to connect peer")
}

/// Connect and wait until the room keys have arrived
pub async fn joined_peer(server: &TestServer, username: &str, room: &str) -> PeerClient {
    let mut client = connect_peer(server, username, room).await;
    match next_event(&mut client).await {
        PeerEvent::Joined { .. } => client,
        other => panic!("{username} expected Joined, got {other:?}"),
    }
}

pub async fn next_event(client: &mut PeerClient) -> PeerEvent {
    tokio::time::timeout(EVENT_TIMEOUT, client.next_event())
        .await
        .expect("Timed out waiting for event")
        .expect("Peer error")
        .expect("Connection closed")
}

/// A WebSocket without a peer session, for sending arbitrary frames
pub type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn raw_socket(server: &TestServer) -> RawSocket {
    let (socket, _response) = connect_async(server.ws_url())
        .await
        .expect("Failed to connect raw socket");
    socket
}

/// JOIN_ROOM carrying the shared test public key
pub fn join_json(username: &str, room: &str) -> String {
    Frame::JoinRoom(JoinRoomFrame {
        username: username.to_string(),
        room: room.to_string(),
        code: CODE_OK,
        public_key: peer_keys().public_key_pem().expect("PEM encoding"),
    })
    .to_json()
    .expect("Failed to encode join")
}

/// Frames received on `socket` until the relay drops it
pub async fn frames_until_closed(socket: &mut RawSocket) -> Vec<Frame> {
    let mut frames = Vec::new();
    loop {
        let message = tokio::time::timeout(EVENT_TIMEOUT, socket.next())
            .await
            .expect("Timed out waiting for the relay to close");
        match message {
            Some(Ok(Message::Text(text))) => {
                frames.push(Frame::from_json(text.as_str()).expect("Malformed frame"));
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return frames,
            Some(Ok(_)) => {}
        }
    }
}

pub async fn get_json(server: &TestServer, path: &str) -> (u16, serde_json::Value) {
    let response = reqwest::get(format!("{}{}", server.base_url(), path))
        .await
        .expect("Failed to send request");
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}
