//! ルームディレクトリの実装
//!
//! ドメイン層の RoomRepository trait を実装します。
//! ゲートウェイとユースケースは `Arc<dyn RoomRepository>` 経由でのみ触れます。

pub mod inmemory;

pub use inmemory::InMemoryRoomRepository;
