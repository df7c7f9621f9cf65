//! Fixtures shared by the unit tests of every layer.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use kakurega_shared::KeyPair;
use tokio::sync::Mutex;

use crate::{
    domain::{
        ConnectionId, ConnectionIdFactory, Member, MessagePushError, MessagePusher, RoomName,
        Timestamp, Username,
    },
    infrastructure::dto::websocket::Frame,
};

pub const TEST_KEY_BITS: usize = 1024;

/// One key pair per test binary; generation dominates test time otherwise.
pub fn test_key_pair() -> Arc<KeyPair> {
    static KEY_PAIR: OnceLock<Arc<KeyPair>> = OnceLock::new();
    KEY_PAIR
        .get_or_init(|| Arc::new(KeyPair::generate(TEST_KEY_BITS).expect("key generation")))
        .clone()
}

pub fn room_name(name: &str) -> RoomName {
    RoomName::new(name.to_string()).unwrap()
}

pub fn username(name: &str) -> Username {
    Username::new(name.to_string()).unwrap()
}

/// A member on a fresh connection
pub fn member(name: &str) -> Member {
    Member::new(ConnectionIdFactory::generate(), username(name), Timestamp::new(0))
}

/// MessagePusher that records every delivery and never fails
#[derive(Default)]
pub struct RecordingPusher {
    pushed: Mutex<Vec<(ConnectionId, String)>>,
}

impl RecordingPusher {
    /// Frames delivered to `target`, in order
    pub async fn frames_for(&self, target: &ConnectionId) -> Vec<Frame> {
        let pushed = self.pushed.lock().await;
        pushed
            .iter()
            .filter(|(id, _)| id == target)
            .map(|(_, payload)| Frame::from_json(payload).unwrap())
            .collect()
    }

    pub async fn total(&self) -> usize {
        self.pushed.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for RecordingPusher {
    async fn push_to(&self, target: &ConnectionId, payload: String) -> Result<(), MessagePushError> {
        self.pushed.lock().await.push((*target, payload));
        Ok(())
    }
}
