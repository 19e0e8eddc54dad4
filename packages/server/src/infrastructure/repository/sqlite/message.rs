//! SQLite Message Repository 実装
//!
//! ドメイン層が定義する MessageRepository trait の永続化実装。
//! `messages` テーブルへの INSERT は単一文で行うため、メッセージは
//! 完全に保存されるか、まったく保存されないかのどちらかになります。
//!
//! rusqlite はブロッキング API のため、各操作は `spawn_blocking` 上で実行します。

use std::sync::Arc;

use async_trait::async_trait;
use hiroba_shared::time::{Clock, SystemClock};
use rusqlite::{Connection, params};

use crate::domain::{
    ChatMessage, MessageBody, MessageId, MessageRepository, RepositoryError, SenderName,
    Timestamp,
};

use super::{
    connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory},
    error::{Result, SqliteStoreError},
    migrations::run_migrations,
};

/// `messages` テーブルの 1 行
struct MessageRow {
    id: i64,
    sender: String,
    body: String,
    created_at: i64,
}

impl MessageRow {
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_entity(self) -> Result<ChatMessage> {
        let corrupt = |reason: String| SqliteStoreError::CorruptRow {
            id: self.id,
            reason,
        };
        let id = MessageId::new(self.id).map_err(|e| corrupt(e.to_string()))?;
        let body = MessageBody::new(&self.body).map_err(|e| corrupt(e.to_string()))?;
        Ok(ChatMessage::new(
            id,
            SenderName::new(&self.sender),
            body,
            Timestamp::new(self.created_at),
        ))
    }
}

/// SQLite Message Repository 実装
pub struct SqliteMessageRepository {
    pool: ConnectionPool,
    clock: Arc<dyn Clock>,
}

impl SqliteMessageRepository {
    /// プールからリポジトリを作成し、未適用のマイグレーションを実行する
    pub fn new(pool: ConnectionPool, clock: Arc<dyn Clock>) -> Result<Self> {
        {
            let conn = pool.get()?;
            run_migrations(&conn)?;
        }
        Ok(Self { pool, clock })
    }

    /// SQLite ファイルを開く（存在しなければ作成する）
    pub fn open_file(path: &str, config: &ConnectionConfig) -> Result<Self> {
        tracing::info!("Opening message database at '{}'", path);
        Self::new(new_file(path, config)?, Arc::new(SystemClock))
    }

    /// インメモリの SQLite データベースを開く
    pub fn open_in_memory(config: &ConnectionConfig) -> Result<Self> {
        Self::new(new_in_memory(config)?, Arc::new(SystemClock))
    }

    /// プールからコネクションを取得し、ブロッキングスレッド上で `f` を実行する
    async fn with_connection<T, F>(&self, f: F) -> std::result::Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T> {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| RepositoryError::Unavailable(format!("blocking task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!("Message store operation failed: {}", e);
            RepositoryError::from(e)
        })
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn append(
        &self,
        sender: SenderName,
        body: MessageBody,
    ) -> std::result::Result<ChatMessage, RepositoryError> {
        let created_at = Timestamp::new(self.clock.now_millis());

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO messages (sender, body, created_at) VALUES (?1, ?2, ?3)",
                params![sender.as_str(), body.as_str(), created_at.value()],
            )?;
            let id = conn.last_insert_rowid();
            let id = MessageId::new(id).map_err(|e| SqliteStoreError::CorruptRow {
                id,
                reason: e.to_string(),
            })?;
            Ok(ChatMessage::new(id, sender, body, created_at))
        })
        .await
    }

    async fn recent(&self, limit: usize) -> std::result::Result<Vec<ChatMessage>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_connection(move |conn| {
            // 単一の SELECT で取得するため、並行する追記があっても窓の中に欠番・重複は生じない
            let mut stmt = conn.prepare_cached(
                "SELECT id, sender, body, created_at FROM (
                    SELECT id, sender, body, created_at FROM messages
                    ORDER BY id DESC LIMIT ?1
                 ) ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(params![limit], MessageRow::map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(MessageRow::into_entity).collect()
        })
        .await
    }

    async fn count(&self) -> std::result::Result<u64, RepositoryError> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}
