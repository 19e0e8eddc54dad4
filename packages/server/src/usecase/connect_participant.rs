//! UseCase: 参加者接続処理（履歴リプレイ）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - レジストリへの登録と、最新履歴の取得
//!
//! ### なぜこのテストが必要か
//! - 新規参加者は、ライブ配信の前に直近の履歴を古い順に受け取る必要がある
//! - リプレイ中に追記されたメッセージを取りこぼさないこと（登録が先）を保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：履歴が 50 件以下 / 50 件超
//! - 異常系：履歴を読み出せない（Message Store 障害）
//! - エッジケース：リプレイ中に追記されたメッセージ

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{
    ChatMessage, ConnectionHandle, ConnectionId, ConnectionIdFactory, ConnectionRegistry,
    MessageId, MessageRepository,
};

use super::error::ConnectError;

/// 接続処理の結果
///
/// `live` には登録直後からのブロードキャストが溜まる。
/// 呼び出し側は `history` を送り終えてから `live` の送信を開始する。
#[derive(Debug)]
pub struct JoinedConnection {
    pub id: ConnectionId,
    pub history: Vec<ChatMessage>,
    pub live: LiveFeed,
}

/// リプレイ後のライブ配信の受信口
///
/// 登録から履歴取得までの間にブロードキャストされたメッセージは、送信キューと
/// 履歴の両方に入り得る。リプレイ済みの ID 以下のメッセージは読み飛ばす。
#[derive(Debug)]
pub struct LiveFeed {
    outbound: mpsc::Receiver<ChatMessage>,
    replayed_through: Option<MessageId>,
}

impl LiveFeed {
    pub fn new(outbound: mpsc::Receiver<ChatMessage>, replayed_through: Option<MessageId>) -> Self {
        Self {
            outbound,
            replayed_through,
        }
    }

    /// リプレイした最後のメッセージ ID
    pub fn replayed_through(&self) -> Option<MessageId> {
        self.replayed_through
    }

    /// 次に送るべきメッセージ
    ///
    /// 送信キューが閉じられた（登録解除された）場合は `None`。
    /// `select!` の中で使っても取りこぼさない。
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        loop {
            let message = self.outbound.recv().await?;
            if self.is_replayed(&message) {
                tracing::debug!("Skipping message {} already sent during replay", message.id);
                continue;
            }
            return Some(message);
        }
    }

    fn is_replayed(&self, message: &ChatMessage) -> bool {
        self.replayed_through
            .is_some_and(|last| message.id <= last)
    }
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（Message Store の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// Registry（接続中コネクションの抽象化）
    registry: Arc<dyn ConnectionRegistry>,
    /// リプレイする履歴の件数
    history_limit: usize,
    /// コネクションごとの送信キューの容量
    outbound_buffer: usize,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        history_limit: usize,
        outbound_buffer: usize,
    ) -> Self {
        Self {
            repository,
            registry,
            history_limit,
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// 参加者接続を実行
    ///
    /// 1. コネクションを Joining 状態でレジストリに登録する
    /// 2. 最新 `history_limit` 件の履歴を古い順に取得する
    ///
    /// 登録を履歴取得より先に行うため、リプレイ中に追記されたメッセージは
    /// 送信キューに溜まり、取りこぼされない（重複は `LiveFeed` が除く）。
    ///
    /// # Returns
    ///
    /// * `Ok(JoinedConnection)` - 登録済みのコネクションと履歴
    /// * `Err(ConnectError)` - 履歴を取得できなかった（登録は取り消し済み）
    pub async fn execute(&self) -> Result<JoinedConnection, ConnectError> {
        let id = ConnectionIdFactory::generate();
        let (tx, rx) = mpsc::channel(self.outbound_buffer);

        // 1. レジストリに登録
        self.registry.add(ConnectionHandle::new(id, tx)).await;

        // 2. 履歴を取得
        match self.repository.recent(self.history_limit).await {
            Ok(history) => {
                tracing::debug!("Loaded {} history messages for '{}'", history.len(), id);
                let replayed_through = history.last().map(|message| message.id);
                Ok(JoinedConnection {
                    id,
                    history,
                    live: LiveFeed::new(rx, replayed_through),
                })
            }
            Err(e) => {
                self.registry.remove(id).await;
                Err(ConnectError::HistoryUnavailable(e.to_string()))
            }
        }
    }

    /// リプレイ完了後、コネクションを Live にする
    ///
    /// リプレイ中に切断・除外されていた場合は `false`。
    pub async fn mark_live(&self, id: ConnectionId) -> bool {
        self.registry.mark_live(id).await
    }
}
