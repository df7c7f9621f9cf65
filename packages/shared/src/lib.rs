//! Shared utilities for the Kakurega server and client.
//!
//! - [`logger`]: tracing subscriber setup used by every binary
//! - [`time`]: JST timestamp helpers
//! - [`key_exchange`]: RSA key pairs and the chunked encryption used to hand
//!   room keys to joining members

pub mod key_exchange;
pub mod logger;
pub mod time;

pub use key_exchange::{KeyExchangeError, KeyPair};
