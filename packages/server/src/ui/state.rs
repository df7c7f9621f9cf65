//! Shared application state.

use std::sync::Arc;

use crate::{domain::RoomRepository, infrastructure::pusher::ChannelMessagePusher};

use super::gateway::Gateway;

pub struct AppState {
    /// Repository（データアクセス層の抽象化）
    pub repository: Arc<dyn RoomRepository>,
    /// Per-connection outbound queues, shared with the gateway's broadcaster
    pub pusher: Arc<ChannelMessagePusher>,
    pub gateway: Arc<Gateway>,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        pusher: Arc<ChannelMessagePusher>,
        outbound_buffer: usize,
    ) -> Self {
        let gateway = Arc::new(Gateway::new(repository.clone(), pusher.clone()));
        Self {
            repository,
            pusher,
            gateway,
            outbound_buffer,
        }
    }
}
