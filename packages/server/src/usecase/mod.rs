//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層（ゲートウェイ）から呼び出され、Domain 層を操作します。

pub mod broadcast;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod relay_message;
pub mod sweep_empty_rooms;

pub use broadcast::{BroadcastReport, RoomBroadcaster};
pub use error::{JoinRoomError, RelayMessageError};
pub use join_room::{JoinOutcome, JoinRoomUseCase};
pub use leave_room::LeaveRoomUseCase;
pub use relay_message::RelayMessageUseCase;
pub use sweep_empty_rooms::SweepEmptyRoomsUseCase;
