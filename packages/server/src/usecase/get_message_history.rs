//! UseCase: メッセージ履歴取得処理（HTTP API 用）

use std::sync::Arc;

use crate::domain::{ChatMessage, MessageRepository, RepositoryError};

/// `limit` 未指定時の件数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// 一度に返す最大件数
pub const MAX_HISTORY_LIMIT: usize = 500;

/// メッセージ履歴取得のユースケース
pub struct GetMessageHistoryUseCase {
    repository: Arc<dyn MessageRepository>,
}

impl GetMessageHistoryUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>) -> Self {
        Self { repository }
    }

    /// 最新 `limit` 件を古い順に返す
    ///
    /// `limit` は未指定なら 50、上限 500 に丸める。
    pub async fn execute(&self, limit: Option<usize>) -> Result<Vec<ChatMessage>, RepositoryError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY_LIMIT);
        self.repository.recent(limit).await
    }
}
