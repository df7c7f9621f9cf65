//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリのルームディレクトリとして使用します。
//!
//! ## 排他制御
//!
//! ディレクトリ全体（全ルームとそのメンバー）を 1 つの Mutex で保護します。
//! 各メソッドはロックを取得してから読み書きするため、メンバー追加・削除・
//! スイープは互いにアトミックです。
//! ルーム鍵の生成は CPU 負荷が高いため、ロックの外で blocking pool に逃がします。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use kakurega_shared::KeyPair;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, Departure, Member, RepositoryError, Room, RoomName, RoomRepository, Timestamp,
    Username,
};

/// インメモリ Room Repository 実装
///
/// ルーム名から Room へのマッピングを保持するルームディレクトリ。
/// ドメイン層の RoomRepository trait を実装します（依存性の逆転）。
pub struct InMemoryRoomRepository {
    /// ルームディレクトリ
    rooms: Arc<Mutex<HashMap<RoomName, Room>>>,
    /// 新規ルームの鍵長（bit）
    key_bits: usize,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new(rooms: Arc<Mutex<HashMap<RoomName, Room>>>, key_bits: usize) -> Self {
        Self { rooms, key_bits }
    }

    /// 空のディレクトリで作成
    pub fn with_key_bits(key_bits: usize) -> Self {
        Self::new(Arc::new(Mutex::new(HashMap::new())), key_bits)
    }

    async fn generate_key_pair(&self) -> Result<Arc<KeyPair>, RepositoryError> {
        let bits = self.key_bits;
        let key_pair = tokio::task::spawn_blocking(move || KeyPair::generate(bits))
            .await
            .map_err(|e| RepositoryError::KeyGeneration(e.to_string()))?
            .map_err(|e| RepositoryError::KeyGeneration(e.to_string()))?;
        Ok(Arc::new(key_pair))
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn get_or_create_room(&self, name: &RoomName) -> Result<Room, RepositoryError> {
        {
            let rooms = self.rooms.lock().await;
            if let Some(room) = rooms.get(name) {
                return Ok(room.clone());
            }
        }

        // 鍵生成中にロックを保持しない。競合した場合は先に挿入した方が勝つ
        let key_pair = self.generate_key_pair().await?;
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(name.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created", name);
            Room::new(name.clone(), key_pair, Timestamp::now())
        });
        Ok(room.clone())
    }

    async fn get_room(&self, name: &RoomName) -> Result<Room, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::RoomNotFound(name.to_string()))
    }

    async fn is_username_unique(&self, name: &RoomName, username: &Username) -> bool {
        let rooms = self.rooms.lock().await;
        rooms
            .get(name)
            .is_none_or(|room| !room.has_username(username))
    }

    async fn add_member(&self, name: &RoomName, member: Member) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(name)
            .ok_or_else(|| RepositoryError::RoomNotFound(name.to_string()))?;
        room.add_member(member)?;
        Ok(room.clone())
    }

    async fn remove_member_from_all_rooms(&self, connection_id: &ConnectionId) -> Vec<Departure> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .values_mut()
            .filter_map(|room| {
                room.remove_member(connection_id).map(|member| Departure {
                    room: room.name.clone(),
                    member,
                    remaining: room.members.clone(),
                })
            })
            .collect()
    }

    async fn sweep_empty_rooms(&self) -> Vec<RoomName> {
        let mut rooms = self.rooms.lock().await;
        let mut empty: Vec<RoomName> = rooms
            .iter()
            .filter(|(_, room)| room.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        empty.sort();

        for name in &empty {
            rooms.remove(name);
            tracing::info!("Room '{}' deleted as it became empty", name);
        }
        empty
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut snapshot: Vec<Room> = rooms.values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }
}
