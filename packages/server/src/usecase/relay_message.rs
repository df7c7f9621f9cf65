//! UseCase: チャット・メディアの中継処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelayMessageUseCase::relay_chat() / relay_media()
//! - CHAT_MESSAGE を USER_MESSAGE に、MEDIA_MESSAGE をそのまま付け替えて中継する
//!
//! ### なぜこのテストが必要か
//! - サーバーはペイロードを復号しない（ルーム秘密鍵を持つ参加者だけが読める）
//! - 送信者には自分のメッセージが返らないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：チャット、メディアの中継
//! - 異常系：存在しないルーム、メンバーでない送信者
//!
//! メディアはペイロードを hex にしただけで、ルーム鍵では暗号化されていない。
//! チャットとの非対称はそのまま中継する。

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, Room, RoomName, RoomRepository},
    infrastructure::dto::websocket::{
        CODE_OK, Frame, MediaMessageFrame, MessageColor, UserMessageFrame,
    },
};

use super::{
    broadcast::{BroadcastReport, RoomBroadcaster},
    error::RelayMessageError,
};

/// メッセージ中継のユースケース
pub struct RelayMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl RelayMessageUseCase {
    /// 新しい RelayMessageUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    /// 暗号化済みチャットを USER_MESSAGE として中継
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者の接続
    /// * `room_name` - 宛先ルーム
    /// * `message` - hex 暗号文（復号せずそのまま渡す）
    pub async fn relay_chat(
        &self,
        sender: &ConnectionId,
        room_name: &RoomName,
        message: String,
    ) -> Result<BroadcastReport, RelayMessageError> {
        let (room, username) = self.sender_context(sender, room_name).await?;
        let frame = Frame::UserMessage(UserMessageFrame {
            color: MessageColor::Blue,
            username,
            message,
            code: CODE_OK,
        });

        let report = self
            .broadcaster
            .broadcast(&room, &frame.to_json()?, Some(sender))
            .await;
        tracing::debug!(
            "Relayed chat in room '{}' to {} member(s) ({} failed)",
            room_name,
            report.delivered,
            report.failed
        );
        Ok(report)
    }

    /// メディアを MEDIA_MESSAGE として中継
    pub async fn relay_media(
        &self,
        sender: &ConnectionId,
        room_name: &RoomName,
        message: String,
        filename: String,
    ) -> Result<BroadcastReport, RelayMessageError> {
        let (room, username) = self.sender_context(sender, room_name).await?;
        tracing::info!(
            "Relaying media '{}' ({} hex chars) from '{}' in room '{}'",
            filename,
            message.len(),
            username,
            room_name
        );
        let frame = Frame::MediaMessage(MediaMessageFrame {
            color: Some(MessageColor::Blue),
            username,
            room: Some(room_name.to_string()),
            message,
            filename,
            code: CODE_OK,
        });

        Ok(self
            .broadcaster
            .broadcast(&room, &frame.to_json()?, Some(sender))
            .await)
    }

    /// ルームのスナップショットと、送信者に紐づくユーザー名
    async fn sender_context(
        &self,
        sender: &ConnectionId,
        room_name: &RoomName,
    ) -> Result<(Room, String), RelayMessageError> {
        let room = self
            .repository
            .get_room(room_name)
            .await
            .map_err(|_| RelayMessageError::RoomNotFound(room_name.to_string()))?;
        let username = room
            .get_member(sender)
            .map(|m| m.username.to_string())
            .ok_or_else(|| RelayMessageError::NotAMember(room_name.to_string()))?;
        Ok((room, username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Member,
        infrastructure::repository::InMemoryRoomRepository,
        test_support::{RecordingPusher, TEST_KEY_BITS, member, room_name},
    };

    struct Fixture {
        pusher: Arc<RecordingPusher>,
        usecase: RelayMessageUseCase,
        alice: Member,
        bob: Member,
        charlie: Member,
    }

    async fn create_fixture() -> Fixture {
        let repository = Arc::new(InMemoryRoomRepository::with_key_bits(TEST_KEY_BITS));
        let lobby = room_name("lobby");
        repository.get_or_create_room(&lobby).await.unwrap();
        let (alice, bob, charlie) = (member("alice"), member("bob"), member("charlie"));
        for m in [&alice, &bob, &charlie] {
            repository.add_member(&lobby, m.clone()).await.unwrap();
        }
        let pusher = Arc::new(RecordingPusher::default());
        let broadcaster = Arc::new(RoomBroadcaster::new(pusher.clone()));
        Fixture {
            pusher,
            usecase: RelayMessageUseCase::new(repository, broadcaster),
            alice,
            bob,
            charlie,
        }
    }

    #[tokio::test]
    async fn test_relay_chat_retags_as_user_message() {
        // テスト項目: チャットは USER_MESSAGE として送信者以外に、暗号文そのままで届く
        // given (前提条件):
        let f = create_fixture().await;

        // when (操作):
        let report = f
            .usecase
            .relay_chat(&f.alice.connection_id, &room_name("lobby"), "deadbeef".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });
        assert!(f.pusher.frames_for(&f.alice.connection_id).await.is_empty());
        for recipient in [&f.bob, &f.charlie] {
            let frames = f.pusher.frames_for(&recipient.connection_id).await;
            assert_eq!(
                frames,
                vec![Frame::UserMessage(UserMessageFrame {
                    color: MessageColor::Blue,
                    username: "alice".to_string(),
                    message: "deadbeef".to_string(),
                    code: CODE_OK,
                })]
            );
        }
    }

    #[tokio::test]
    async fn test_relay_media_passes_bytes_and_filename_through() {
        // テスト項目: メディアは hex とファイル名がそのまま中継される
        // given (前提条件):
        let f = create_fixture().await;

        // when (操作):
        f.usecase
            .relay_media(
                &f.bob.connection_id,
                &room_name("lobby"),
                "00010203".to_string(),
                "x.bin".to_string(),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let frames = f.pusher.frames_for(&f.alice.connection_id).await;
        let Frame::MediaMessage(media) = &frames[0] else {
            panic!("expected MediaMessage");
        };
        assert_eq!(media.username, "bob");
        assert_eq!(media.message, "00010203");
        assert_eq!(media.filename, "x.bin");
        assert!(f.pusher.frames_for(&f.bob.connection_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_relay_to_missing_room_fails() {
        // テスト項目: 存在しないルームへの中継は RoomNotFound になる
        // given (前提条件):
        let f = create_fixture().await;

        // when (操作):
        let result = f
            .usecase
            .relay_chat(&f.alice.connection_id, &room_name("nowhere"), "00".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RelayMessageError::RoomNotFound(_))));
        assert_eq!(f.pusher.total().await, 0);
    }

    #[tokio::test]
    async fn test_relay_from_non_member_fails() {
        // テスト項目: メンバーでない接続からの中継は拒否される
        // given (前提条件):
        let f = create_fixture().await;
        let outsider = member("mallory");

        // when (操作):
        let result = f
            .usecase
            .relay_chat(&outsider.connection_id, &room_name("lobby"), "00".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RelayMessageError::NotAMember(_))));
        assert_eq!(f.pusher.total().await, 0);
    }
}
