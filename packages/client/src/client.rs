//! A [`PeerSession`] bound to a live [`PeerConnection`].

use std::collections::VecDeque;

use kakurega_server::infrastructure::dto::websocket::Frame;

use crate::{
    error::ClientError,
    peer::{PeerEvent, PeerSession},
    transport::PeerConnection,
};

pub struct PeerClient {
    session: PeerSession,
    connection: PeerConnection,
    /// Events decoded but not yet handed out
    events: VecDeque<PeerEvent>,
}

impl PeerClient {
    /// Connect to the relay and request to join the session's room
    pub async fn join(url: &str, mut session: PeerSession) -> Result<Self, ClientError> {
        let mut connection = PeerConnection::connect(url).await?;
        let join = session.connect()?;
        connection.send(&join).await?;
        tracing::info!("Requested to join '{}' as '{}'", session.room(), session.username());
        Ok(Self {
            session,
            connection,
            events: VecDeque::new(),
        })
    }

    pub fn session(&self) -> &PeerSession {
        &self.session
    }

    /// Next event from the session, reading frames as needed.
    ///
    /// Returns `None` once the relay closes the connection.
    pub async fn next_event(&mut self) -> Result<Option<PeerEvent>, ClientError> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(event));
            }
            match self.connection.next_frame().await? {
                Some(frame) => self.events.extend(self.session.handle_frame(frame)?),
                None => {
                    self.session.disconnected();
                    return Ok(None);
                }
            }
        }
    }

    pub async fn retry_join(&mut self, username: &str) -> Result<(), ClientError> {
        let join = self.session.retry_join(username)?;
        self.send(&join).await
    }

    pub async fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        let frame = self.session.chat(text)?;
        self.send(&frame).await
    }

    pub async fn send_media(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ClientError> {
        let frame = self.session.media(filename, bytes)?;
        self.send(&frame).await
    }

    /// Announce departure and close the connection
    pub async fn leave(mut self) -> Result<(), ClientError> {
        let frame = self.session.leave();
        self.send(&frame).await?;
        // The relay drops the socket as soon as it sees the leave
        if let Err(e) = self.connection.close().await {
            tracing::debug!("Close after leave: {}", e);
        }
        Ok(())
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        self.connection.send(frame).await
    }
}
