//! Channel-backed MessagePusher.
//!
//! Each WebSocket connection registers the sending half of a bounded mpsc
//! queue; a forwarding task drains the receiving half into the socket.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, Timestamp};

/// Client connection information
pub struct ClientInfo {
    /// Outbound queue of serialized frames
    pub sender: mpsc::Sender<String>,
    /// When the connection was accepted
    pub connected_at: Timestamp,
}

/// Registry of outbound queues, keyed by connection
pub struct ChannelMessagePusher {
    connected_clients: Arc<Mutex<HashMap<ConnectionId, ClientInfo>>>,
}

impl ChannelMessagePusher {
    pub fn new(connected_clients: Arc<Mutex<HashMap<ConnectionId, ClientInfo>>>) -> Self {
        Self { connected_clients }
    }

    /// Register the outbound queue of a new connection
    pub async fn register(&self, connection_id: ConnectionId, sender: mpsc::Sender<String>) {
        let mut clients = self.connected_clients.lock().await;
        clients.insert(
            connection_id,
            ClientInfo {
                sender,
                connected_at: Timestamp::now(),
            },
        );
    }

    /// Forget a connection and return when it was registered
    pub async fn unregister(&self, connection_id: &ConnectionId) -> Option<Timestamp> {
        let mut clients = self.connected_clients.lock().await;
        clients.remove(connection_id).map(|info| info.connected_at)
    }

    pub async fn count_connected_clients(&self) -> usize {
        let clients = self.connected_clients.lock().await;
        clients.len()
    }
}

#[async_trait]
impl MessagePusher for ChannelMessagePusher {
    async fn push_to(&self, target: &ConnectionId, payload: String) -> Result<(), MessagePushError> {
        // Release the registry lock before waiting on a full queue
        let sender = {
            let clients = self.connected_clients.lock().await;
            clients
                .get(target)
                .map(|info| info.sender.clone())
                .ok_or_else(|| MessagePushError::ConnectionNotFound(target.to_string()))?
        };

        sender
            .send(payload)
            .await
            .map_err(|_| MessagePushError::ConnectionClosed(target.to_string()))
    }
}
