//! UseCase: 退室・切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 接続を全ルームから削除し、残りのメンバーへ退室（code 400）を通知する
//!
//! ### なぜこのテストが必要か
//! - ゲートウェイは接続の所属ルームを管理しないため、全ルームを走査する必要がある
//! - LEAVE_ROOM、切断、エラーのいずれでも同じ後始末が行われることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：退室と通知
//! - エッジケース：最後のメンバーの退室（通知対象なし、ルームはスイープまで残る）
//! - エッジケース：どのルームにも属さない接続（何もしない）

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, Departure, RoomRepository},
    infrastructure::dto::websocket::{CODE_MEMBER_LEFT, Frame, MessageColor, SystemMessageFrame},
};

use super::broadcast::RoomBroadcaster;

/// 退室・切断のユースケース
pub struct LeaveRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    /// 退室を実行
    ///
    /// # Returns
    ///
    /// 接続が抜けたルームごとの退室情報
    pub async fn execute(&self, connection_id: &ConnectionId) -> Vec<Departure> {
        let departures = self
            .repository
            .remove_member_from_all_rooms(connection_id)
            .await;

        for departure in &departures {
            tracing::info!(
                "'{}' left room '{}' ({} member(s) remaining)",
                departure.member.username,
                departure.room,
                departure.remaining.len()
            );
            self.announce(departure).await;
        }
        departures
    }

    async fn announce(&self, departure: &Departure) {
        let username = departure.member.username.to_string();
        let frame = Frame::SystemMessage(SystemMessageFrame {
            username: Some(username.clone()),
            room: Some(departure.room.to_string()),
            ..SystemMessageFrame::notice(
                MessageColor::Red,
                CODE_MEMBER_LEFT,
                format!("{username} has left the chat room."),
            )
        });
        let payload = match frame.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize leave notice: {}", e);
                return;
            }
        };

        let recipients: Vec<ConnectionId> = departure
            .remaining
            .iter()
            .map(|m| m.connection_id)
            .collect();
        self.broadcaster.deliver(&recipients, &payload).await;
    }
}
