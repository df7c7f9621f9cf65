//! WebSocket transport for a peer.

use futures_util::{SinkExt, StreamExt};
use kakurega_server::infrastructure::dto::websocket::Frame;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame, protocol::frame::coding::CloseCode},
};

use crate::error::ClientError;

/// A connection to the relay, speaking [`Frame`]s
pub struct PeerConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PeerConnection {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _response) =
            connect_async(url)
                .await
                .map_err(|source| ClientError::Connect {
                    url: url.to_string(),
                    source: Box::new(source),
                })?;
        tracing::debug!("Connected to {}", url);
        Ok(Self { stream })
    }

    pub async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let json = frame.to_json()?;
        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))
    }

    /// Next frame from the relay, or `None` once the connection is closed.
    ///
    /// Cancel safe: nothing is buffered between awaits.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, ClientError> {
        while let Some(message) = self.stream.next().await {
            match message.map_err(|e| ClientError::Transport(Box::new(e)))? {
                Message::Text(text) => return Ok(Some(Frame::from_json(text.as_str())?)),
                Message::Close(_) => return Ok(None),
                Message::Binary(_) => {
                    tracing::warn!("Ignoring binary frame from relay");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.stream
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))
    }
}
