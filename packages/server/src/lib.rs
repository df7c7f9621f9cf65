//! Kakurega relay server.
//!
//! Peers join named rooms over WebSocket, receive the room's RSA key pair
//! sealed under their own public key, and exchange ciphertext the server
//! relays without decrypting.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

#[cfg(test)]
mod test_support;

// Re-export entry points
pub use config::ServerConfig;
pub use error::ServerError;
pub use ui::{run_server, serve};
