//! インメモリの ConnectionRegistry 実装
//!
//! ## 責務
//!
//! - 接続中のコネクションと、その送信キュー（`ConnectionHandle`）の管理
//! - コネクションの状態（Joining / Live）の管理
//! - ブロードキャスト用スナップショットの提供
//!
//! ## 設計ノート
//!
//! WebSocket の生成と送信ループは UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は送信キューの送信側だけを保持し、登録解除時にそれを破棄します。
//! 送信側がすべて破棄されると送信ループは残りのキューを送り切って終了し、
//! WebSocket が閉じられます。

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ConnectionHandle, ConnectionId, ConnectionRegistry, ConnectionState};

struct Entry {
    handle: ConnectionHandle,
    state: ConnectionState,
}

/// インメモリ ConnectionRegistry 実装
///
/// ## フィールド
///
/// - `connections`: ConnectionId 順（= 登録順）に並んだコネクションのマップ
///
/// ## 使用例
///
/// ```ignore
/// let registry = InMemoryConnectionRegistry::new();
/// registry.add(handle).await;
///
/// for handle in registry.snapshot().await {
///     handle.push(message.clone())?;
/// }
/// ```
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    connections: RwLock<BTreeMap<ConnectionId, Entry>>,
}

impl InMemoryConnectionRegistry {
    /// 新しい InMemoryConnectionRegistry を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn add(&self, handle: ConnectionHandle) {
        let id = handle.id;
        let mut connections = self.connections.write().await;
        connections.insert(
            id,
            Entry {
                handle,
                state: ConnectionState::Joining,
            },
        );
        tracing::debug!("Connection '{}' registered (total: {})", id, connections.len());
    }

    async fn mark_live(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&id) {
            Some(entry) => {
                entry.state = ConnectionState::Live;
                true
            }
            None => false,
        }
    }

    async fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            tracing::debug!("Connection '{}' unregistered (total: {})", id, connections.len());
        }
        removed
    }

    async fn snapshot(&self) -> Vec<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections.values().map(|entry| entry.handle.clone()).collect()
    }

    async fn state(&self, id: ConnectionId) -> ConnectionState {
        let connections = self.connections.read().await;
        connections
            .get(&id)
            .map(|entry| entry.state)
            .unwrap_or(ConnectionState::Closed)
    }

    async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    async fn close_all(&self) -> usize {
        let mut connections = self.connections.write().await;
        let closed = connections.len();
        connections.clear();
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionIdFactory;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 登録・登録解除・スナップショット・状態遷移
    //
    // 【なぜこのテストが必要か】
    // - レジストリは全ブロードキャストが読み、全接続・切断が書く共有状態
    // - 配信失敗と明示的な切断が競合しても壊れないこと（冪等な remove）を保証する
    //
    // 【どのようなシナリオをテストするか】
    // 1. add 直後は Joining、mark_live で Live、remove で Closed
    // 2. remove を 2 回呼んでも 1 回と同じ結果
    // 3. スナップショットは登録順で、その後の変更を反映しない
    // 4. close_all で全件が解除され、送信ループ側のキューが閉じる
    // ========================================

    fn create_test_handle() -> (ConnectionHandle, mpsc::Receiver<crate::domain::ChatMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionHandle::new(ConnectionIdFactory::generate(), tx), rx)
    }

    #[tokio::test]
    async fn test_state_transitions() {
        // テスト項目: Joining -> Live -> Closed の順に遷移する
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (handle, _rx) = create_test_handle();
        let id = handle.id;

        // when (操作) / then (期待する結果):
        registry.add(handle).await;
        assert_eq!(registry.state(id).await, ConnectionState::Joining);

        assert!(registry.mark_live(id).await);
        assert_eq!(registry.state(id).await, ConnectionState::Live);

        assert!(registry.remove(id).await);
        assert_eq!(registry.state(id).await, ConnectionState::Closed);

        // Closed からは戻らない
        assert!(!registry.mark_live(id).await);
        assert_eq!(registry.state(id).await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        // テスト項目: 同じコネクションを 2 回登録解除しても 1 回と同じ結果になる
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (alice, _rx1) = create_test_handle();
        let (bob, _rx2) = create_test_handle();
        let alice_id = alice.id;
        registry.add(alice).await;
        registry.add(bob).await;

        // when (操作):
        let first = registry.remove(alice_id).await;
        let second = registry.remove(alice_id).await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_copy() {
        // テスト項目: スナップショットは登録順のコピーで、取得後の変更を反映しない
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (first, _rx1) = create_test_handle();
        let (second, _rx2) = create_test_handle();
        let (third, _rx3) = create_test_handle();
        let ids = vec![first.id, second.id, third.id];
        registry.add(first).await;
        registry.add(second).await;

        // when (操作):
        let snapshot = registry.snapshot().await;
        registry.add(third).await;
        registry.remove(ids[0]).await;

        // then (期待する結果):
        let snapshot_ids: Vec<ConnectionId> = snapshot.iter().map(|h| h.id).collect();
        assert_eq!(snapshot_ids, vec![ids[0], ids[1]]);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_close_all_closes_outbound_queues() {
        // テスト項目: close_all で全コネクションが解除され、送信キューが閉じる
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (alice, mut rx1) = create_test_handle();
        let (bob, mut rx2) = create_test_handle();
        registry.add(alice).await;
        registry.add(bob).await;

        // when (操作):
        let closed = registry.close_all().await;

        // then (期待する結果):
        assert_eq!(closed, 2);
        assert_eq!(registry.count().await, 0);
        assert_eq!(rx1.recv().await, None);
        assert_eq!(rx2.recv().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_add_and_remove() {
        // テスト項目: 並行な登録・解除でメンバーシップが壊れない
        // given (前提条件):
        let registry = std::sync::Arc::new(InMemoryConnectionRegistry::new());
        let mut receivers = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let (handle, rx) = create_test_handle();
            receivers.push(rx);
            handles.push(handle);
        }

        // when (操作): 全件を並行に登録し、偶数番目を並行に解除する
        let mut tasks = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let id = handle.id;
                registry.add(handle).await;
                if i % 2 == 0 {
                    registry.remove(id).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // then (期待する結果):
        assert_eq!(registry.count().await, 25);
        assert_eq!(registry.snapshot().await.len(), 25);
    }
}
