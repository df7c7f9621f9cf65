//! Repository trait for the room directory.
//!
//! The domain layer owns the abstraction; infrastructure provides the
//! implementation (dependency inversion). Every mutating method is atomic with
//! respect to the others.

use async_trait::async_trait;

use super::{
    entity::{Member, Room},
    error::RepositoryError,
    value_object::{ConnectionId, RoomName, Username},
};

/// One membership removed by a leave or disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: RoomName,
    pub member: Member,
    /// Members still in the room after the removal
    pub remaining: Vec<Member>,
}

/// Room directory: room name to Room.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Return a snapshot of the named room, creating it (and its key pair)
    /// when absent.
    async fn get_or_create_room(&self, name: &RoomName) -> Result<Room, RepositoryError>;

    /// Return a snapshot of the named room.
    async fn get_room(&self, name: &RoomName) -> Result<Room, RepositoryError>;

    /// False iff the room exists and a member already uses `username`.
    async fn is_username_unique(&self, name: &RoomName, username: &Username) -> bool;

    /// Bind `member` into the named room and return the room after insertion.
    async fn add_member(&self, name: &RoomName, member: Member) -> Result<Room, RepositoryError>;

    /// Remove the connection from every room it belongs to.
    async fn remove_member_from_all_rooms(&self, connection_id: &ConnectionId) -> Vec<Departure>;

    /// Drop every room without members and return their names.
    async fn sweep_empty_rooms(&self) -> Vec<RoomName>;

    /// Snapshots of all rooms, sorted by name.
    async fn list_rooms(&self) -> Vec<Room>;
}
