//! Peer state machine.
//!
//! Frames in, frames and events out. The machine never touches a socket or
//! the terminal; [`crate::transport`] and [`crate::console`] do the I/O.
//!
//! ```text
//! Idle --connect--> AwaitingRoomKeys --keys(200)--> Active --leave--> Disconnected
//!                     ^          |
//!                     +--409-----+  (retry_join with a new username)
//! ```
//!
//! Chat and media relayed before the room keys arrive are held and replayed
//! right after the `Joined` event.

use std::{fmt, mem};

use kakurega_server::infrastructure::dto::websocket::{
    CODE_MEMBER_LEFT, CODE_OK, CODE_USERNAME_CONFLICT, ChatMessageFrame, Frame, JoinRoomFrame,
    LeaveRoomFrame, MediaMessageFrame, MessageColor, SystemMessageFrame, UserMessageFrame,
};
use kakurega_shared::{
    KeyExchangeError, KeyPair,
    key_exchange::{SealedKeyPair, decrypt_hex, encrypt_to_hex},
};
use thiserror::Error;

/// Relayed messages held while the room keys are outstanding
const MAX_HELD_FRAMES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Idle,
    AwaitingRoomKeys,
    Active,
    Disconnected,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerState::Idle => "idle",
            PeerState::AwaitingRoomKeys => "awaiting room keys",
            PeerState::Active => "active",
            PeerState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// What the machine surfaces to its I/O adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// The requested username is taken; call [`PeerSession::retry_join`]
    UsernameRejected { username: String, message: String },
    /// Room keys received and opened
    Joined { room: String, message: String },
    Notice { color: MessageColor, message: String },
    MemberLeft { username: String, message: String },
    Chat { username: String, text: String },
    Media {
        username: String,
        filename: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("room key exchange failed: {0}")]
    RoomKeys(#[source] KeyExchangeError),

    #[error("cannot decrypt message from '{username}': {source}")]
    UndecryptableChat {
        username: String,
        #[source]
        source: KeyExchangeError,
    },

    #[error("cannot encrypt message: {0}")]
    Encryption(#[source] KeyExchangeError),

    #[error("malformed media '{filename}' from '{username}': {source}")]
    MalformedMedia {
        username: String,
        filename: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: PeerState,
    },

    #[error("unexpected {kind} while {state}")]
    UnexpectedFrame { kind: &'static str, state: PeerState },
}

impl PeerError {
    /// Whether the session must end. A single bad message is survivable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PeerError::UndecryptableChat { .. } | PeerError::MalformedMedia { .. }
        )
    }
}

/// One participant's view of one room
pub struct PeerSession {
    username: String,
    room: String,
    own_keys: KeyPair,
    room_keys: Option<KeyPair>,
    state: PeerState,
    held: Vec<Frame>,
}

impl PeerSession {
    pub fn new(username: impl Into<String>, room: impl Into<String>, own_keys: KeyPair) -> Self {
        Self {
            username: username.into(),
            room: room.into(),
            own_keys,
            room_keys: None,
            state: PeerState::Idle,
            held: Vec::new(),
        }
    }

    /// Create a session with a freshly generated key pair
    pub fn generate(
        username: impl Into<String>,
        room: impl Into<String>,
        key_bits: usize,
    ) -> Result<Self, KeyExchangeError> {
        Ok(Self::new(username, room, KeyPair::generate(key_bits)?))
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// The room's key pair, once joined
    pub fn room_keys(&self) -> Option<&KeyPair> {
        self.room_keys.as_ref()
    }

    /// Frame requesting to join; moves `Idle -> AwaitingRoomKeys`
    pub fn connect(&mut self) -> Result<Frame, PeerError> {
        self.expect_state(PeerState::Idle, "connect")?;
        let frame = self.join_frame()?;
        self.state = PeerState::AwaitingRoomKeys;
        Ok(frame)
    }

    /// Join again under a different username after a 409
    pub fn retry_join(&mut self, username: impl Into<String>) -> Result<Frame, PeerError> {
        self.expect_state(PeerState::AwaitingRoomKeys, "retry join")?;
        self.username = username.into();
        self.join_frame()
    }

    /// Apply one frame from the relay.
    ///
    /// Usually yields a single event. A held message yields none, and the
    /// key reply yields `Joined` followed by whatever was held.
    pub fn handle_frame(&mut self, frame: Frame) -> Result<Vec<PeerEvent>, PeerError> {
        match (self.state, frame) {
            (
                PeerState::AwaitingRoomKeys,
                frame @ (Frame::UserMessage(_) | Frame::MediaMessage(_)),
            ) => {
                self.hold(frame);
                Ok(Vec::new())
            }
            (PeerState::AwaitingRoomKeys | PeerState::Active, Frame::SystemMessage(system)) => {
                let mut events = vec![self.handle_system(system)?];
                if self.state == PeerState::Active {
                    events.extend(self.replay_held());
                }
                Ok(events)
            }
            (PeerState::Active, frame @ (Frame::UserMessage(_) | Frame::MediaMessage(_))) => {
                Ok(vec![self.handle_relayed(frame)?])
            }
            (state, frame) => Err(PeerError::UnexpectedFrame {
                kind: frame.kind(),
                state,
            }),
        }
    }

    /// Encrypt `text` under the room public key
    pub fn chat(&self, text: &str) -> Result<Frame, PeerError> {
        let room_keys = self.active_room_keys("chat")?;
        let message =
            encrypt_to_hex(text.as_bytes(), room_keys.public_key()).map_err(PeerError::Encryption)?;
        Ok(Frame::ChatMessage(ChatMessageFrame {
            username: self.username.clone(),
            room: self.room.clone(),
            message,
            code: CODE_OK,
        }))
    }

    /// Media goes out hex encoded only; it is not encrypted with the room key
    pub fn media(&self, filename: impl Into<String>, bytes: &[u8]) -> Result<Frame, PeerError> {
        self.active_room_keys("send media")?;
        Ok(Frame::MediaMessage(MediaMessageFrame {
            color: None,
            username: self.username.clone(),
            room: Some(self.room.clone()),
            message: hex::encode(bytes),
            filename: filename.into(),
            code: CODE_OK,
        }))
    }

    /// Frame announcing departure; the session is over afterwards
    pub fn leave(&mut self) -> Frame {
        self.state = PeerState::Disconnected;
        self.room_keys = None;
        self.held.clear();
        Frame::LeaveRoom(LeaveRoomFrame {
            username: self.username.clone(),
            room: self.room.clone(),
            code: CODE_MEMBER_LEFT,
        })
    }

    /// The transport went away without a leave
    pub fn disconnected(&mut self) {
        self.state = PeerState::Disconnected;
        self.room_keys = None;
        self.held.clear();
    }

    fn hold(&mut self, frame: Frame) {
        if self.held.len() >= MAX_HELD_FRAMES {
            tracing::warn!(
                "Dropping {} received before the room keys: {} already held",
                frame.kind(),
                MAX_HELD_FRAMES
            );
            return;
        }
        tracing::debug!("Holding {} until the room keys arrive", frame.kind());
        self.held.push(frame);
    }

    /// Events for the held messages; a bad message is skipped, not fatal
    fn replay_held(&mut self) -> Vec<PeerEvent> {
        mem::take(&mut self.held)
            .into_iter()
            .filter_map(|frame| match self.handle_relayed(frame) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping held message: {}", e);
                    None
                }
            })
            .collect()
    }

    fn handle_relayed(&self, frame: Frame) -> Result<PeerEvent, PeerError> {
        match frame {
            Frame::UserMessage(user) => self.handle_user_message(user),
            Frame::MediaMessage(media) => handle_media(media),
            frame => Err(PeerError::UnexpectedFrame {
                kind: frame.kind(),
                state: self.state,
            }),
        }
    }

    fn handle_system(&mut self, system: SystemMessageFrame) -> Result<PeerEvent, PeerError> {
        match system.code {
            CODE_USERNAME_CONFLICT if self.state == PeerState::AwaitingRoomKeys => {
                Ok(PeerEvent::UsernameRejected {
                    username: self.username.clone(),
                    message: system.message,
                })
            }
            CODE_OK if self.state == PeerState::AwaitingRoomKeys => {
                let (Some(public_key), Some(private_key)) = (system.public_key, system.private_key)
                else {
                    return Ok(PeerEvent::Notice {
                        color: system.color,
                        message: system.message,
                    });
                };
                let sealed = SealedKeyPair {
                    public_key,
                    private_key,
                };
                let room_keys = sealed
                    .open(self.own_keys.private_key())
                    .map_err(PeerError::RoomKeys)?;
                self.room_keys = Some(room_keys);
                self.state = PeerState::Active;
                Ok(PeerEvent::Joined {
                    room: self.room.clone(),
                    message: system.message,
                })
            }
            CODE_MEMBER_LEFT => Ok(PeerEvent::MemberLeft {
                username: system.username.unwrap_or_default(),
                message: system.message,
            }),
            _ => Ok(PeerEvent::Notice {
                color: system.color,
                message: system.message,
            }),
        }
    }

    fn handle_user_message(&self, user: UserMessageFrame) -> Result<PeerEvent, PeerError> {
        let room_keys = self.active_room_keys("read chat")?;
        let text = decrypt_hex(&user.message, room_keys.private_key())
            .and_then(|bytes| String::from_utf8(bytes).map_err(KeyExchangeError::from));
        match text {
            Ok(text) => Ok(PeerEvent::Chat {
                username: user.username,
                text,
            }),
            Err(source) => Err(PeerError::UndecryptableChat {
                username: user.username,
                source,
            }),
        }
    }

    fn join_frame(&self) -> Result<Frame, PeerError> {
        let public_key = self
            .own_keys
            .public_key_pem()
            .map_err(PeerError::RoomKeys)?;
        Ok(Frame::JoinRoom(JoinRoomFrame {
            username: self.username.clone(),
            room: self.room.clone(),
            code: CODE_OK,
            public_key,
        }))
    }

    fn expect_state(&self, expected: PeerState, action: &'static str) -> Result<(), PeerError> {
        if self.state != expected {
            return Err(PeerError::InvalidState {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    fn active_room_keys(&self, action: &'static str) -> Result<&KeyPair, PeerError> {
        match (&self.state, &self.room_keys) {
            (PeerState::Active, Some(keys)) => Ok(keys),
            _ => Err(PeerError::InvalidState {
                action,
                state: self.state,
            }),
        }
    }
}

fn handle_media(media: MediaMessageFrame) -> Result<PeerEvent, PeerError> {
    match hex::decode(&media.message) {
        Ok(bytes) => Ok(PeerEvent::Media {
            username: media.username,
            filename: media.filename,
            bytes,
        }),
        Err(source) => Err(PeerError::MalformedMedia {
            username: media.username,
            filename: media.filename,
            source,
        }),
    }
}
