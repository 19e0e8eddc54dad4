//! Repository trait 定義
//!
//! ドメイン層が必要とするメッセージ永続化（Message Store）のインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ChatMessage, MessageBody, RepositoryError, SenderName};

/// Message Store trait
///
/// 追記専用のチャットメッセージのログ。更新・削除の操作は持たない。
///
/// ## 順序
///
/// - `append` が採番する ID は、過去に採番したどの ID よりも大きい
///   （永続化実装ではプロセス再起動をまたいでも保証する）
/// - タイムスタンプは表示用であり、順序付けには使わない
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを追記し、採番済みのレコードを返す
    ///
    /// 書き込めない場合は `RepositoryError::Unavailable` を返す。
    /// その場合メッセージは一切永続化されていない。
    async fn append(
        &self,
        sender: SenderName,
        body: MessageBody,
    ) -> Result<ChatMessage, RepositoryError>;

    /// 最新 `limit` 件を古い順に返す
    ///
    /// ログが `limit` 件に満たない場合は全件を返す。
    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// 保存済みメッセージ数
    async fn count(&self) -> Result<u64, RepositoryError>;
}
