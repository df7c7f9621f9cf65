//! MessagePusher の実装

pub mod channel;

pub use channel::{ChannelMessagePusher, ClientInfo};
