//! Infrastructure layer: DTOs and implementations of the domain traits.

pub mod dto;
pub mod pusher;
pub mod repository;
