//! Core domain models for the room relay.

use std::sync::Arc;

use kakurega_shared::KeyPair;

use super::{
    error::RoomError,
    value_object::{ConnectionId, RoomName, Timestamp, Username},
};

/// A named broadcast domain sharing one key pair.
///
/// `members` is a bijection between connections and usernames: no username
/// and no connection appears twice. The key pair is fixed for the lifetime of
/// the room.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room name, unique within the directory
    pub name: RoomName,
    /// Members in join order
    pub members: Vec<Member>,
    /// Room-wide key pair handed to every member on join
    pub key_pair: Arc<KeyPair>,
    /// Timestamp when the room was created
    pub created_at: Timestamp,
}

impl Room {
    /// Create a new empty room
    pub fn new(name: RoomName, key_pair: Arc<KeyPair>, created_at: Timestamp) -> Self {
        Self {
            name,
            members: Vec::new(),
            key_pair,
            created_at,
        }
    }

    /// Add a member to the room
    ///
    /// # Errors
    ///
    /// Returns `RoomError::UsernameTaken` if another member already uses the
    /// username, or `RoomError::AlreadyMember` if the connection has joined.
    pub fn add_member(&mut self, member: Member) -> Result<(), RoomError> {
        if self.get_member(&member.connection_id).is_some() {
            return Err(RoomError::AlreadyMember {
                room: self.name.to_string(),
                connection_id: member.connection_id.to_string(),
            });
        }
        if self.has_username(&member.username) {
            return Err(RoomError::UsernameTaken {
                room: self.name.to_string(),
                username: member.username.to_string(),
            });
        }
        self.members.push(member);
        Ok(())
    }

    /// Remove the member bound to `connection_id`, if any
    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let index = self
            .members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        Some(self.members.remove(index))
    }

    /// Get a member by connection
    pub fn get_member(&self, connection_id: &ConnectionId) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| &m.connection_id == connection_id)
    }

    pub fn has_username(&self, username: &Username) -> bool {
        self.members.iter().any(|m| &m.username == username)
    }

    /// Connections a broadcast should reach, in join order
    pub fn recipients(&self, exclude: Option<&ConnectionId>) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|m| Some(&m.connection_id) != exclude)
            .map(|m| m.connection_id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A connection bound to a username inside one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub username: Username,
    /// Timestamp when the member joined
    pub joined_at: Timestamp,
}

impl Member {
    /// Create a new member
    pub fn new(connection_id: ConnectionId, username: Username, joined_at: Timestamp) -> Self {
        Self {
            connection_id,
            username,
            joined_at,
        }
    }
}
