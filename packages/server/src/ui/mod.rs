//! WebSocket relay server: connection gateway, handlers and startup.

pub mod gateway;
mod handler;
mod runner;
mod signal;
pub mod state;

pub use gateway::{ConnectionState, Gateway, GatewayError};
pub use runner::{build_router, run_server, serve};
