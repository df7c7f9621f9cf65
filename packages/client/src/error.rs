//! Client errors.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::{media::MediaError, peer::PeerError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tungstenite::Error>,
    },

    #[error("transport error: {0}")]
    Transport(#[source] Box<tungstenite::Error>),

    #[error("malformed frame: {0}")]
    Frame(#[from] serde_json::Error),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] kakurega_shared::KeyExchangeError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("input closed")]
    InputClosed,
}
