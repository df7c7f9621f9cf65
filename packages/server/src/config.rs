//! Server configuration.

use std::time::Duration;

use kakurega_shared::key_exchange::DEFAULT_KEY_BITS;

pub const DEFAULT_PORT: u16 = 7081;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Period of the empty-room sweep; must be non-zero
    pub sweep_interval: Duration,
    /// Modulus size of newly generated room key pairs
    pub room_key_bits: usize,
    /// Capacity of each connection's outbound queue; must be non-zero
    pub outbound_buffer: usize,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            room_key_bits: DEFAULT_KEY_BITS,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}
