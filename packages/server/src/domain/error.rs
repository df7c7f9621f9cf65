//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// Username validation error
    #[error("Username cannot be empty")]
    UsernameEmpty,

    /// Username too long error
    #[error("Username cannot exceed {max} characters (got {actual})")]
    UsernameTooLong { max: usize, actual: usize },

    /// RoomName validation error
    #[error("RoomName cannot be empty")]
    RoomNameEmpty,

    /// RoomName too long error
    #[error("RoomName cannot exceed {max} characters (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },
}

/// Errors related to Room membership rules
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Another member already uses this username
    #[error("Username '{username}' is already taken in room '{room}'")]
    UsernameTaken { room: String, username: String },

    /// The connection is already a member of the room
    #[error("Connection '{connection_id}' is already a member of room '{room}'")]
    AlreadyMember { room: String, connection_id: String },
}

/// Errors raised by RoomRepository implementations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("Failed to generate room key pair: {0}")]
    KeyGeneration(String),
}

/// Errors raised while delivering a payload to one connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),

    #[error("Connection '{0}' has closed its outbound queue")]
    ConnectionClosed(String),
}
