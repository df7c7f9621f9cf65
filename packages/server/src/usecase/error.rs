//! UseCase 層のエラー定義

use kakurega_shared::KeyExchangeError;
use thiserror::Error;

use crate::domain::RepositoryError;

/// ルーム参加のエラー
#[derive(Debug, Error)]
pub enum JoinRoomError {
    /// 参加者の公開鍵を解釈できない
    #[error("invalid peer public key: {0}")]
    InvalidPeerKey(#[source] KeyExchangeError),

    /// ルーム鍵の暗号化に失敗
    #[error("failed to seal room keys: {0}")]
    KeyExchange(#[source] KeyExchangeError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to serialize frame: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// チャット・メディア中継のエラー
#[derive(Debug, Error)]
pub enum RelayMessageError {
    /// 宛先のルームがディレクトリに存在しない
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    /// 送信者がルームのメンバーではない
    #[error("connection is not a member of room '{0}'")]
    NotAMember(String),

    #[error("failed to serialize frame: {0}")]
    Serialization(#[from] serde_json::Error),
}
