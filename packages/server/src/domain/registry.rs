//! Connection Registry trait 定義
//!
//! 接続中のコネクション集合を管理するインターフェース。
//! 多数のタスクから同時に読み書きされる唯一の共有可変状態です。

use async_trait::async_trait;

use super::{ConnectionHandle, ConnectionId, ConnectionState};

/// Connection Registry trait
///
/// ## 並行性
///
/// - `add` / `remove` / `mark_live` は直列化される
/// - `snapshot` はある一時点のメンバーシップのコピーを返し、
///   呼び出し側はロックを保持せずに走査できる
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// コネクションを Joining 状態で登録する
    async fn add(&self, handle: ConnectionHandle);

    /// Joining のコネクションを Live にする
    ///
    /// 登録されていない（すでに Closed の）場合は `false`。
    async fn mark_live(&self, id: ConnectionId) -> bool;

    /// コネクションを登録解除する（冪等）
    ///
    /// 実際に削除した場合のみ `true`。二度目以降の呼び出しは何もしない。
    async fn remove(&self, id: ConnectionId) -> bool;

    /// 登録中の全コネクションのコピーを登録順に返す
    async fn snapshot(&self) -> Vec<ConnectionHandle>;

    /// コネクションの現在の状態
    ///
    /// 登録されていない ID は `Closed`。
    async fn state(&self, id: ConnectionId) -> ConnectionState;

    /// 登録中のコネクション数
    async fn count(&self) -> usize;

    /// 全コネクションを登録解除し、解除した数を返す（シャットダウン時）
    async fn close_all(&self) -> usize;
}
