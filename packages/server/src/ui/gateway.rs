//! Per-connection protocol state machine.
//!
//! `AwaitingJoin -> Joined(room) -> Closed`. A username conflict keeps the
//! connection in `AwaitingJoin` so the peer can retry; every error returned
//! from [`Gateway::handle_text`] tears the connection down, after which the
//! handler runs [`Gateway::close`] to remove it from every room.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    domain::{ConnectionId, MessagePusher, RoomName, RoomRepository, Username, ValueObjectError},
    infrastructure::dto::websocket::{
        CODE_OK, CODE_USERNAME_CONFLICT, ChatMessageFrame, Frame, JoinRoomFrame,
        MediaMessageFrame, MessageColor, SystemMessageFrame,
    },
    usecase::{
        JoinOutcome, JoinRoomError, JoinRoomUseCase, LeaveRoomUseCase, RelayMessageError,
        RelayMessageUseCase, RoomBroadcaster,
    },
};

const JOINED_MESSAGE: &str = "[INFO] Connected to the chat room.";
const USERNAME_CONFLICT_MESSAGE: &str =
    "[ERROR] Username already exists in the room. Please choose a different username.";

/// Protocol state of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingJoin,
    Joined { room: RoomName },
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::AwaitingJoin => write!(f, "awaiting join"),
            ConnectionState::Joined { room } => write!(f, "joined '{room}'"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Errors that end a connection
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid field: {0}")]
    InvalidField(#[from] ValueObjectError),

    #[error(transparent)]
    Join(#[from] JoinRoomError),

    #[error(transparent)]
    Relay(RelayMessageError),
}

/// Dispatches frames to the use cases and replies to the sender.
pub struct Gateway {
    join_room: JoinRoomUseCase,
    relay_message: RelayMessageUseCase,
    leave_room: LeaveRoomUseCase,
    broadcaster: Arc<RoomBroadcaster>,
}

impl Gateway {
    pub fn new(repository: Arc<dyn RoomRepository>, pusher: Arc<dyn MessagePusher>) -> Self {
        let broadcaster = Arc::new(RoomBroadcaster::new(pusher));
        Self {
            join_room: JoinRoomUseCase::new(repository.clone(), broadcaster.clone()),
            relay_message: RelayMessageUseCase::new(repository.clone(), broadcaster.clone()),
            leave_room: LeaveRoomUseCase::new(repository, broadcaster.clone()),
            broadcaster,
        }
    }

    /// Decode one text frame and dispatch it
    pub async fn handle_text(
        &self,
        connection_id: &ConnectionId,
        state: ConnectionState,
        text: &str,
    ) -> Result<ConnectionState, GatewayError> {
        let frame = Frame::from_json(text)?;
        tracing::debug!(
            "Received {} from '{}' ({})",
            frame.kind(),
            connection_id,
            state
        );
        self.dispatch(connection_id, state, frame).await
    }

    /// Apply one frame to the connection's state
    pub async fn dispatch(
        &self,
        connection_id: &ConnectionId,
        state: ConnectionState,
        frame: Frame,
    ) -> Result<ConnectionState, GatewayError> {
        match (state, frame) {
            (ConnectionState::Closed, frame) => Err(GatewayError::Protocol(format!(
                "{} received on a closed connection",
                frame.kind()
            ))),
            (_, Frame::LeaveRoom(_)) => {
                self.leave_room.execute(connection_id).await;
                Ok(ConnectionState::Closed)
            }
            (ConnectionState::AwaitingJoin, Frame::JoinRoom(join)) => {
                self.join(connection_id, join).await
            }
            (ConnectionState::Joined { room }, Frame::ChatMessage(chat)) => {
                self.chat(connection_id, room, chat).await
            }
            (ConnectionState::Joined { room }, Frame::MediaMessage(media)) => {
                self.media(connection_id, room, media).await
            }
            (state, frame) => Err(GatewayError::Protocol(format!(
                "unexpected {} while {}",
                frame.kind(),
                state
            ))),
        }
    }

    /// Remove the connection from every room and announce the departure
    pub async fn close(&self, connection_id: &ConnectionId) {
        self.leave_room.execute(connection_id).await;
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        join: JoinRoomFrame,
    ) -> Result<ConnectionState, GatewayError> {
        let username = Username::new(join.username)?;
        let room = RoomName::new(join.room)?;

        let outcome = self
            .join_room
            .execute(*connection_id, username.clone(), room.clone(), &join.public_key)
            .await?;

        match outcome {
            JoinOutcome::UsernameTaken => {
                tracing::info!(
                    "Rejected username '{}' for room '{}': already taken",
                    username,
                    room
                );
                let reply = Frame::SystemMessage(SystemMessageFrame::notice(
                    MessageColor::Red,
                    CODE_USERNAME_CONFLICT,
                    USERNAME_CONFLICT_MESSAGE,
                ));
                self.broadcaster
                    .reply(connection_id, reply.to_json()?)
                    .await;
                Ok(ConnectionState::AwaitingJoin)
            }
            JoinOutcome::Joined { room, sealed } => {
                // The joiner holds no room keys until this reply, so it is
                // queued before any frame the announcement could trigger.
                let reply = Frame::SystemMessage(SystemMessageFrame {
                    public_key: Some(sealed.public_key),
                    private_key: Some(sealed.private_key),
                    ..SystemMessageFrame::notice(MessageColor::Green, CODE_OK, JOINED_MESSAGE)
                });
                self.broadcaster
                    .reply(connection_id, reply.to_json()?)
                    .await;
                self.join_room.announce(&room, connection_id).await?;
                Ok(ConnectionState::Joined { room: room.name })
            }
        }
    }

    async fn chat(
        &self,
        connection_id: &ConnectionId,
        room: RoomName,
        chat: ChatMessageFrame,
    ) -> Result<ConnectionState, GatewayError> {
        ensure_joined_room(&room, &chat.room)?;
        let result = self
            .relay_message
            .relay_chat(connection_id, &room, chat.message)
            .await;
        settle_relay(result)?;
        Ok(ConnectionState::Joined { room })
    }

    async fn media(
        &self,
        connection_id: &ConnectionId,
        room: RoomName,
        media: MediaMessageFrame,
    ) -> Result<ConnectionState, GatewayError> {
        if let Some(target) = &media.room {
            ensure_joined_room(&room, target)?;
        }
        let result = self
            .relay_message
            .relay_media(connection_id, &room, media.message, media.filename)
            .await;
        settle_relay(result)?;
        Ok(ConnectionState::Joined { room })
    }
}

fn ensure_joined_room(joined: &RoomName, target: &str) -> Result<(), GatewayError> {
    if joined.as_str() != target {
        return Err(GatewayError::Protocol(format!(
            "message addressed to room '{target}' but connection joined '{joined}'"
        )));
    }
    Ok(())
}

/// A vanished room drops the message; anything else ends the connection.
fn settle_relay<T>(result: Result<T, RelayMessageError>) -> Result<(), GatewayError> {
    match result {
        Ok(_) => Ok(()),
        Err(RelayMessageError::RoomNotFound(room)) => {
            tracing::warn!("Dropping message for unknown room '{}'", room);
            Ok(())
        }
        Err(e) => Err(GatewayError::Relay(e)),
    }
}
