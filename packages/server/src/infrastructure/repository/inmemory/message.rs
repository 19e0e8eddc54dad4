//! InMemory Message Repository 実装
//!
//! ドメイン層が定義する MessageRepository trait の具体的な実装。
//! `Vec` をインメモリ DB として使用します。プロセス終了時に内容は失われます。

use std::sync::Arc;

use async_trait::async_trait;
use hiroba_shared::time::{Clock, SystemClock};
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, MessageBody, MessageId, MessageRepository, RepositoryError, SenderName,
    Timestamp,
};

/// ロック内で保持するログ本体
#[derive(Default)]
struct Log {
    messages: Vec<ChatMessage>,
    last_id: i64,
}

/// インメモリ Message Repository 実装
///
/// 採番と追記は同じロックの中で行うため、ID の順序とログ上の順序は常に一致します。
pub struct InMemoryMessageRepository {
    log: Mutex<Log>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageRepository {
    /// システム時計を使う InMemoryMessageRepository を作成
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 任意の Clock を使う InMemoryMessageRepository を作成
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            log: Mutex::new(Log::default()),
            clock,
        }
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(
        &self,
        sender: SenderName,
        body: MessageBody,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut log = self.log.lock().await;

        let id = MessageId::new(log.last_id + 1)
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        let message = ChatMessage::new(id, sender, body, Timestamp::new(self.clock.now_millis()));

        log.last_id = id.value();
        log.messages.push(message.clone());

        Ok(message)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError> {
        let log = self.log.lock().await;
        let start = log.messages.len().saturating_sub(limit);
        Ok(log.messages[start..].to_vec())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let log = self.log.lock().await;
        Ok(log.messages.len() as u64)
    }
}
