//! UseCase: メッセージ送信処理（永続化 + ファンアウト）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージの永続化と、登録中の全コネクションへのブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 送信者を含む全コネクションがメッセージをちょうど 1 回受け取ることを保証
//! - 配信に失敗したコネクションだけが除外され、他に影響しないことを保証
//! - 並行送信時も全コネクションで同じ順序（ID 順）になることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：3 コネクションへのブロードキャスト
//! - 異常系：本文が空、Message Store 障害、シャットダウン後の送信
//! - エッジケース：外部から閉じられたコネクション、送信キュー満杯、並行送信、
//!   追記中の呼び出し側の中断

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, ConnectionId, ConnectionRegistry, DeliveryError, MessageBody,
    MessageRepository, SenderName,
};

use super::error::SendMessageError;

/// ブロードキャストの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// 永続化されたメッセージ
    pub message: ChatMessage,
    /// 送信キューに積めたコネクション（スナップショット順）
    pub delivered: Vec<ConnectionId>,
    /// 配信に失敗し、登録解除したコネクション
    pub evicted: Vec<(ConnectionId, DeliveryError)>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（Message Store の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// Registry（接続中コネクションの抽象化）
    registry: Arc<dyn ConnectionRegistry>,
    /// 追記とファンアウトを直列化するロック（中身はシャットダウン済みフラグ）
    ///
    /// 全コネクションの送信キューに入る順序が ID 順と一致する。
    sequencer: Arc<Mutex<bool>>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        Self {
            repository,
            registry,
            sequencer: Arc::new(Mutex::new(false)),
        }
    }

    /// メッセージ送信を実行
    ///
    /// 1. 本文を検証する（前後の空白を除いて空なら `EmptyBody`）
    /// 2. Message Store に追記する
    /// 3. レジストリのスナップショットを取り、全コネクションの送信キューに積む
    ///
    /// 2 と 3 は sequencer の下で、呼び出し側とは別のタスクで実行する。
    /// 呼び出し側が中断されても、追記されたメッセージは必ずファンアウトまで進む。
    /// 送信キューへの投入は待たないため、遅いコネクションがロックを保持し続けることはない。
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者名（トリム済み）
    /// * `raw_body` - クライアントから受け取った本文（未トリム）
    ///
    /// # Returns
    ///
    /// * `Ok(BroadcastReport)` - 永続化済みメッセージと配信結果
    /// * `Err(SendMessageError)` - 永続化もブロードキャストもしていない
    pub async fn execute(
        &self,
        sender: SenderName,
        raw_body: &str,
    ) -> Result<BroadcastReport, SendMessageError> {
        // 1. 本文の検証
        let body = MessageBody::new(raw_body).map_err(|_| SendMessageError::EmptyBody)?;

        let publish = publish(
            self.repository.clone(),
            self.registry.clone(),
            self.sequencer.clone(),
            sender,
            body,
        );
        tokio::spawn(publish)
            .await
            .map_err(|e| SendMessageError::StoreUnavailable(format!("send task failed: {}", e)))?
    }

    /// 実行中の送信（追記 + ファンアウト）の完了を待ち、以後の送信を拒否する
    ///
    /// シャットダウン時、全コネクションを閉じる前に呼ぶ。
    pub async fn drain(&self) {
        let mut closed = self.sequencer.lock().await;
        *closed = true;
    }
}

/// 追記とファンアウト（sequencer の下で実行）
async fn publish(
    repository: Arc<dyn MessageRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    sequencer: Arc<Mutex<bool>>,
    sender: SenderName,
    body: MessageBody,
) -> Result<BroadcastReport, SendMessageError> {
    let closed = sequencer.lock().await;
    if *closed {
        return Err(SendMessageError::ShuttingDown);
    }

    // 2. 永続化
    let message = repository
        .append(sender, body)
        .await
        .map_err(|e| SendMessageError::StoreUnavailable(e.to_string()))?;

    // 3. ファンアウト
    let targets = registry.snapshot().await;
    let mut delivered = Vec::with_capacity(targets.len());
    let mut evicted = Vec::new();
    for handle in targets {
        match handle.push(message.clone()) {
            Ok(()) => delivered.push(handle.id),
            Err(e) => {
                tracing::warn!("Evicting '{}' from broadcast: {}", handle.id, e);
                registry.remove(handle.id).await;
                evicted.push((handle.id, e));
            }
        }
    }

    tracing::debug!(
        "Message {} fanned out to {} connection(s), {} evicted",
        message.id,
        delivered.len(),
        evicted.len()
    );

    Ok(BroadcastReport {
        message,
        delivered,
        evicted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionHandle, ConnectionIdFactory, ConnectionState, MessageId, RepositoryError,
            repository::MockMessageRepository,
        },
        infrastructure::{
            registry::InMemoryConnectionRegistry, repository::InMemoryMessageRepository,
        },
    };
    use std::time::Duration;
    use tokio::sync::{Notify, mpsc};

    /// `append` の途中で止められる Repository
    struct GatedRepository {
        inner: InMemoryMessageRepository,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl MessageRepository for GatedRepository {
        async fn append(
            &self,
            sender: SenderName,
            body: MessageBody,
        ) -> Result<ChatMessage, RepositoryError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.append(sender, body).await
        }

        async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError> {
            self.inner.recent(limit).await
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            self.inner.count().await
        }
    }

    fn create_test_usecase(
        repository: Arc<dyn MessageRepository>,
        registry: Arc<InMemoryConnectionRegistry>,
    ) -> SendMessageUseCase {
        SendMessageUseCase::new(repository, registry)
    }

    /// Live 状態のコネクションを登録し、受信側を返す
    async fn join(
        registry: &InMemoryConnectionRegistry,
        buffer: usize,
    ) -> (ConnectionId, mpsc::Receiver<ChatMessage>) {
        let id = ConnectionIdFactory::generate();
        let (tx, rx) = mpsc::channel(buffer);
        registry.add(ConnectionHandle::new(id, tx)).await;
        registry.mark_live(id).await;
        (id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection_including_sender() {
        // テスト項目: 送信者を含む全コネクションがメッセージを 1 回だけ受け取る
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository.clone(), registry.clone());
        let (alice, mut alice_rx) = join(&registry, 8).await;
        let (_, mut bob_rx) = join(&registry, 8).await;
        let (_, mut carol_rx) = join(&registry, 8).await;

        // when (操作):
        let report = usecase
            .execute(SenderName::new("alice"), "hello")
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered.len(), 3);
        assert!(report.delivered.contains(&alice));
        assert!(report.evicted.is_empty());
        for rx in [&mut alice_rx, &mut bob_rx, &mut carol_rx] {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.sender.as_str(), "alice");
            assert_eq!(received.body.as_str(), "hello");
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_whitespace_body_is_neither_persisted_nor_broadcast() {
        // テスト項目: 空白のみの本文は永続化もブロードキャストもされない
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository.clone(), registry.clone());
        let (_, mut rx) = join(&registry, 8).await;

        // when (操作):
        let result = usecase.execute(SenderName::new("alice"), "   \t\n").await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::EmptyBody));
        assert_eq!(repository.count().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_body_and_sender_are_trimmed() {
        // テスト項目: 本文と送信者名の前後の空白が除去されて永続化される
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository, registry);

        // when (操作):
        let report = usecase
            .execute(SenderName::new("  alice "), "  hi there  ")
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.message.sender.as_str(), "alice");
        assert_eq!(report.message.body.as_str(), "hi there");
        assert_eq!(report.message.id, MessageId::new(1).unwrap());
    }

    #[tokio::test]
    async fn test_store_unavailable_drops_message() {
        // テスト項目: Message Store 障害時はブロードキャストされず、コネクションは維持される
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository
            .expect_append()
            .times(1)
            .returning(|_, _| Err(RepositoryError::Unavailable("disk full".to_string())));
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(Arc::new(repository), registry.clone());
        let (id, mut rx) = join(&registry, 8).await;

        // when (操作):
        let result = usecase.execute(SenderName::new("alice"), "hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::StoreUnavailable(_))));
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.state(id).await, ConnectionState::Live);
    }

    #[tokio::test]
    async fn test_externally_closed_connection_is_evicted() {
        // テスト項目: 外部から閉じられたコネクションは除外され、他の 2 つには届く
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository, registry.clone());
        let (_, mut first_rx) = join(&registry, 8).await;
        let (closed, closed_rx) = join(&registry, 8).await;
        let (_, mut third_rx) = join(&registry, 8).await;
        drop(closed_rx);

        // when (操作):
        let report = usecase
            .execute(SenderName::new("bob"), "still here?")
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered.len(), 2);
        assert_eq!(report.evicted, vec![(closed, DeliveryError::Closed(closed))]);
        assert_eq!(registry.state(closed).await, ConnectionState::Closed);
        assert_eq!(registry.count().await, 2);
        assert!(first_rx.recv().await.is_some());
        assert!(third_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_slow_connection_is_evicted_when_buffer_full() {
        // テスト項目: 送信キューが満杯のコネクションだけが除外される
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository, registry.clone());
        let (slow, _slow_rx) = join(&registry, 1).await;
        let (fast, mut fast_rx) = join(&registry, 8).await;
        usecase
            .execute(SenderName::new("alice"), "first")
            .await
            .unwrap();

        // when (操作): slow は 1 件目を読まないまま 2 件目が送られる
        let report = usecase
            .execute(SenderName::new("alice"), "second")
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered, vec![fast]);
        assert_eq!(report.evicted, vec![(slow, DeliveryError::BufferFull(slow))]);
        assert_eq!(registry.state(slow).await, ConnectionState::Closed);
        assert_eq!(fast_rx.recv().await.unwrap().body.as_str(), "first");
        assert_eq!(fast_rx.recv().await.unwrap().body.as_str(), "second");
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_observed_in_id_order_everywhere() {
        // テスト項目: 並行送信時、ID は 1..=N で、全コネクションが ID 順に受け取る
        // given (前提条件):
        const N: usize = 40;
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = Arc::new(create_test_usecase(repository, registry.clone()));
        let mut receivers = Vec::new();
        for _ in 0..3 {
            receivers.push(join(&registry, N).await.1);
        }

        // when (操作):
        let mut tasks = Vec::new();
        for i in 0..N {
            let usecase = usecase.clone();
            tasks.push(tokio::spawn(async move {
                usecase
                    .execute(SenderName::new(format!("user{}", i)), "ping")
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // then (期待する結果):
        let expected: Vec<i64> = (1..=N as i64).collect();
        for rx in receivers.iter_mut() {
            let mut ids = Vec::new();
            while let Ok(message) = rx.try_recv() {
                ids.push(message.id.value());
            }
            assert_eq!(ids, expected);
        }
    }

    #[tokio::test]
    async fn test_broadcast_with_no_connections() {
        // テスト項目: 接続がなくても永続化は行われる
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository.clone(), registry);

        // when (操作):
        let report = usecase
            .execute(SenderName::new("alice"), "anyone?")
            .await
            .unwrap();

        // then (期待する結果):
        assert!(report.delivered.is_empty());
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_aborted_caller_still_completes_broadcast() {
        // テスト項目: 追記中に呼び出し側が中断されても、メッセージはファンアウトまで進む
        // given (前提条件):
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let repository = Arc::new(GatedRepository {
            inner: InMemoryMessageRepository::new(),
            entered: entered.clone(),
            release: release.clone(),
        });
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = Arc::new(create_test_usecase(repository.clone(), registry.clone()));
        let (_, mut peer_rx) = join(&registry, 8).await;
        let caller = {
            let usecase = usecase.clone();
            tokio::spawn(async move { usecase.execute(SenderName::new("alice"), "hello").await })
        };
        entered.notified().await;

        // when (操作): 追記の途中で呼び出し側のタスクを中断する
        caller.abort();
        release.notify_one();

        // then (期待する結果):
        let received = tokio::time::timeout(Duration::from_secs(1), peer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.body.as_str(), "hello");
        assert_eq!(repository.count().await.unwrap(), 1);
        assert!(caller.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_send_after_drain_is_refused() {
        // テスト項目: drain 後の送信は永続化もブロードキャストもされない
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = create_test_usecase(repository.clone(), registry.clone());
        let (_, mut rx) = join(&registry, 8).await;
        usecase.drain().await;

        // when (操作):
        let result = usecase.execute(SenderName::new("alice"), "too late").await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::ShuttingDown));
        assert_eq!(repository.count().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }
}
