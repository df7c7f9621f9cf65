//! Domain layer for the room relay.
//!
//! This module contains the room membership model and the abstractions the
//! use cases depend on, independent of DTOs and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Member, Room};
pub use error::{MessagePushError, RepositoryError, RoomError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use pusher::MessagePusher;
pub use repository::{Departure, RoomRepository};
pub use value_object::{ConnectionId, RoomName, Timestamp, Username};
