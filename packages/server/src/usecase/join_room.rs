//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - ユーザー名の一意性チェック、ルームの遅延生成、ルーム鍵の封緘、参加通知
//! - ルーム掃除と競合した場合の 1 回だけの再試行
//!
//! ### なぜこのテストが必要か
//! - 同一ルーム内でユーザー名が重複しないことを保証する
//! - 参加者全員が同じルーム鍵ペアを受け取ることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ルームへの参加、既存ルームへの参加
//! - 異常系：重複ユーザー名（409 で再試行可能）、解釈できない公開鍵

use std::sync::Arc;

use kakurega_shared::key_exchange::{SealedKeyPair, parse_public_key_pem};

use crate::{
    domain::{
        ConnectionId, Member, RepositoryError, Room, RoomError, RoomName, RoomRepository,
        Timestamp, Username,
    },
    infrastructure::dto::websocket::{CODE_OK, Frame, MessageColor, SystemMessageFrame},
};

use super::{
    broadcast::{BroadcastReport, RoomBroadcaster},
    error::JoinRoomError,
};

/// ルーム参加の結果
#[derive(Debug)]
pub enum JoinOutcome {
    /// 参加成功。ルーム鍵ペアは参加者の公開鍵で封緘済み。
    /// `room` は参加直後のスナップショット（参加通知の宛先に使う）
    Joined { room: Room, sealed: SealedKeyPair },
    /// ユーザー名が既に使われている（再試行可能）
    UsernameTaken,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    /// ルーム参加を実行
    ///
    /// 参加通知はここでは送らない。呼び出し側が参加者へ鍵を返信してから
    /// [`JoinRoomUseCase::announce`] を呼ぶことで、返信が通知の配信待ちに
    /// 巻き込まれないようにする。
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 参加する接続
    /// * `username` - ルーム内で一意であるべきユーザー名
    /// * `room_name` - 参加（または作成）するルーム
    /// * `peer_public_key_pem` - 参加者の公開鍵（PKCS#1 PEM）
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - 参加成功、またはユーザー名の重複
    /// * `Err(JoinRoomError)` - 接続を終了すべき失敗
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        username: Username,
        room_name: RoomName,
        peer_public_key_pem: &str,
    ) -> Result<JoinOutcome, JoinRoomError> {
        // 1. 公開鍵の検証（メンバー構成を変更する前に行う）
        let peer_public_key =
            parse_public_key_pem(peer_public_key_pem).map_err(JoinRoomError::InvalidPeerKey)?;

        // 2. 重複チェック
        if !self
            .repository
            .is_username_unique(&room_name, &username)
            .await
        {
            return Ok(JoinOutcome::UsernameTaken);
        }

        // 3. ルームへ追加（ルームが無ければ鍵ペアごと生成）
        let member = Member::new(connection_id, username.clone(), Timestamp::now());
        let room = match self.add_to_room(&room_name, member).await {
            Ok(room) => room,
            Err(RepositoryError::Room(RoomError::UsernameTaken { .. })) => {
                return Ok(JoinOutcome::UsernameTaken);
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Added '{}' to room '{}'", username, room_name);

        // 4. ルーム鍵ペアを参加者の公開鍵で封緘
        let sealed = room
            .key_pair
            .seal_for(&peer_public_key)
            .map_err(JoinRoomError::KeyExchange)?;

        Ok(JoinOutcome::Joined { room, sealed })
    }

    /// 参加者以外のメンバーへ参加を通知
    ///
    /// # Arguments
    ///
    /// * `room` - [`JoinOutcome::Joined`] が返したスナップショット
    /// * `joiner` - 参加した接続（通知の宛先から除く）
    pub async fn announce(
        &self,
        room: &Room,
        joiner: &ConnectionId,
    ) -> Result<BroadcastReport, JoinRoomError> {
        let Some(member) = room.get_member(joiner) else {
            return Ok(BroadcastReport::default());
        };
        let joined = Frame::SystemMessage(SystemMessageFrame::notice(
            MessageColor::Green,
            CODE_OK,
            format!("{} has joined the chat room.", member.username),
        ))
        .to_json()?;
        Ok(self.broadcaster.broadcast(room, &joined, Some(joiner)).await)
    }

    /// get_or_create と add_member の間にスイープされた場合は 1 度だけ再試行する
    async fn add_to_room(&self, room_name: &RoomName, member: Member) -> Result<Room, RepositoryError> {
        let mut retried = false;
        loop {
            self.repository.get_or_create_room(room_name).await?;
            match self.repository.add_member(room_name, member.clone()).await {
                Err(RepositoryError::RoomNotFound(_)) if !retried => {
                    tracing::debug!("Room '{}' was swept during join, retrying", room_name);
                    retried = true;
                }
                result => return result,
            }
        }
    }
}
