//! Client configuration.

use std::path::PathBuf;

use kakurega_shared::key_exchange::DEFAULT_KEY_BITS;

use crate::media::DEFAULT_MEDIA_DIR;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:7081";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    /// Prompted for when absent
    pub username: Option<String>,
    /// Prompted for when absent
    pub room: Option<String>,
    /// Where received media is written
    pub media_dir: PathBuf,
    /// Modulus size of this peer's own key pair
    pub key_bits: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            room: None,
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            key_bits: DEFAULT_KEY_BITS,
        }
    }
}
