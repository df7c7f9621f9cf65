//! UseCase: ルーム内ブロードキャスト
//!
//! 送信者以外のメンバーへ順番にペイロードを届ける。
//! 1 人への送信失敗はログに残すだけで、残りのメンバーへの配信は継続する
//! （ベストエフォート、非アトミック）。
//!
//! 各送信は宛先キューへの投入を待ってから次へ進むため、キューが詰まった
//! 受信者がいると、それ以降の受信者への配信が遅れる（head-of-line blocking）。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, Room};

/// ブロードキャスト結果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// ルーム単位のファンアウト
pub struct RoomBroadcaster {
    pusher: Arc<dyn MessagePusher>,
}

impl RoomBroadcaster {
    /// 新しい RoomBroadcaster を作成
    pub fn new(pusher: Arc<dyn MessagePusher>) -> Self {
        Self { pusher }
    }

    /// `exclude` を除くルームの全メンバーへ送信
    pub async fn broadcast(
        &self,
        room: &Room,
        payload: &str,
        exclude: Option<&ConnectionId>,
    ) -> BroadcastReport {
        self.deliver(&room.recipients(exclude), payload).await
    }

    /// 宛先リストへ順番に送信
    pub async fn deliver(&self, recipients: &[ConnectionId], payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for target in recipients {
            match self.pusher.push_to(target, payload.to_string()).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to send message to connection '{}': {}", target, e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// 単一の接続へ送信（参加結果などの返信用）
    pub async fn reply(&self, target: &ConnectionId, payload: String) -> bool {
        match self.pusher.push_to(target, payload).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to reply to connection '{}': {}", target, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessagePushError, Timestamp, pusher::MockMessagePusher},
        test_support::{RecordingPusher, member, room_name, test_key_pair},
    };

    fn room_with(names: &[&str]) -> Room {
        let mut room = Room::new(room_name("lobby"), test_key_pair(), Timestamp::new(0));
        for name in names {
            room.add_member(member(name)).unwrap();
        }
        room
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_but_sender() {
        // テスト項目: N 人のルームで送信者以外の N-1 人に届く
        // given (前提条件):
        let room = room_with(&["alice", "bob", "charlie", "dave"]);
        let pusher = Arc::new(RecordingPusher::default());
        let broadcaster = RoomBroadcaster::new(pusher.clone());
        let sender = room.members[0].connection_id;

        // when (操作):
        let report = broadcaster.broadcast(&room, "payload", Some(&sender)).await;

        // then (期待する結果):
        assert_eq!(report, BroadcastReport { delivered: 3, failed: 0 });
        assert_eq!(pusher.total().await, 3);
        assert!(pusher.frames_for(&sender).await.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_continues_after_one_failure() {
        // テスト項目: 1 人への送信が失敗しても残り N-2 人には届く
        // given (前提条件):
        let room = room_with(&["alice", "bob", "charlie", "dave"]);
        let sender = room.members[0].connection_id;
        let broken = room.members[2].connection_id;

        let delivered_to = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut pusher = MockMessagePusher::new();
        pusher.expect_push_to().times(3).returning({
            let delivered_to = delivered_to.clone();
            move |target, _payload| {
                if *target == broken {
                    return Err(MessagePushError::ConnectionClosed(target.to_string()));
                }
                delivered_to.lock().unwrap().push(*target);
                Ok(())
            }
        });
        let broadcaster = RoomBroadcaster::new(Arc::new(pusher));

        // when (操作):
        let report = broadcaster.broadcast(&room, "payload", Some(&sender)).await;

        // then (期待する結果): 失敗した宛先の後ろにいる dave にも届いている
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert_eq!(
            *delivered_to.lock().unwrap(),
            vec![room.members[1].connection_id, room.members[3].connection_id]
        );
    }

    #[tokio::test]
    async fn test_broadcast_to_lonely_sender_reaches_nobody() {
        // テスト項目: 送信者しかいないルームでは誰にも送信しない
        // given (前提条件):
        let room = room_with(&["alice"]);
        let sender = room.members[0].connection_id;
        let mut pusher = MockMessagePusher::new();
        pusher.expect_push_to().never();
        let broadcaster = RoomBroadcaster::new(Arc::new(pusher));

        // when (操作):
        let report = broadcaster.broadcast(&room, "payload", Some(&sender)).await;

        // then (期待する結果):
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_reply_reports_failure() {
        // テスト項目: 返信先が失敗した場合は false が返される
        // given (前提条件):
        let target = member("alice").connection_id;
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_push_to()
            .times(1)
            .returning(|target, _| Err(MessagePushError::ConnectionNotFound(target.to_string())));
        let broadcaster = RoomBroadcaster::new(Arc::new(pusher));

        // when (操作):
        let delivered = broadcaster.reply(&target, "payload".to_string()).await;

        // then (期待する結果):
        assert!(!delivered);
    }
}
