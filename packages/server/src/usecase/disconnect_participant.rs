//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() / disconnect_all() メソッド
//! - レジストリからの登録解除
//!
//! ### なぜこのテストが必要か
//! - 切断は受信タスク・送信ループ・ブロードキャストの複数箇所から起こり得るため、
//!   二重の登録解除が 1 回と同じ結果になることを保証する
//! - シャットダウン時に全コネクションの送信キューが閉じられることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断
//! - エッジケース：同じ参加者の二重切断、未登録の参加者の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRegistry};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Registry（接続中コネクションの抽象化）
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 参加者切断を実行
    ///
    /// 登録されていない参加者の切断はエラーではなく、何もしない。
    ///
    /// # Returns
    ///
    /// 今回の呼び出しで実際に登録解除した場合のみ `true`
    pub async fn execute(&self, id: ConnectionId) -> bool {
        let removed = self.registry.remove(id).await;
        if removed {
            tracing::info!(
                "'{}' disconnected ({} connection(s) remaining)",
                id,
                self.registry.count().await
            );
        }
        removed
    }

    /// 全参加者を切断する（シャットダウン時）
    ///
    /// 各コネクションの送信ループは、キューに残ったメッセージを送り切ってから終了する。
    pub async fn disconnect_all(&self) -> usize {
        let closed = self.registry.close_all().await;
        tracing::info!("Closed {} connection(s)", closed);
        closed
    }
}
