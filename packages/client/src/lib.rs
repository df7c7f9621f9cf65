//! Kakurega peer.
//!
//! [`peer`] holds the protocol state machine shared by every front end;
//! [`transport`], [`media`] and [`console`] are its I/O adapters.

pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod media;
pub mod peer;
pub mod transport;

// Re-export entry points
pub use client::PeerClient;
pub use config::ClientConfig;
pub use console::run_client;
pub use error::ClientError;
pub use media::{DirectoryMediaSink, MediaSink};
pub use peer::{PeerError, PeerEvent, PeerSession, PeerState};
