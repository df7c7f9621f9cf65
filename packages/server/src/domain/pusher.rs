//! Outbound delivery to a single connection.

use async_trait::async_trait;

use super::{error::MessagePushError, value_object::ConnectionId};

/// Delivers serialized frames to connections by id.
///
/// Implementations own the per-connection outbound queues. A push may wait
/// while the target's queue is full.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    async fn push_to(&self, target: &ConnectionId, payload: String) -> Result<(), MessagePushError>;
}
