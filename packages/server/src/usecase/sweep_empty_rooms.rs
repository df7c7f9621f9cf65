//! UseCase: 空ルームの回収
//!
//! 退室のたびに同期的に削除するのではなく、定期的なスイープで回収する。
//! そのため最後のメンバーが抜けてから次のスイープまでは、空のルームが残りうる。

use std::{sync::Arc, time::Duration};

use crate::domain::{RoomName, RoomRepository};

/// 空ルーム回収のユースケース
pub struct SweepEmptyRoomsUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
}

impl SweepEmptyRoomsUseCase {
    /// 新しい SweepEmptyRoomsUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// スイープを 1 回実行し、削除したルーム名を返す
    pub async fn execute(&self) -> Vec<RoomName> {
        let swept = self.repository.sweep_empty_rooms().await;
        if !swept.is_empty() {
            tracing::debug!("Swept {} empty room(s)", swept.len());
        }
        swept
    }

    /// `interval` ごとにスイープし続ける（バックグラウンドタスク用）
    pub async fn run_periodically(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // 最初の tick は即座に完了する
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.execute().await;
        }
    }
}
