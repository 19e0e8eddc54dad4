//! UseCase 層のエラー型

use thiserror::Error;

/// 参加者接続のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// 履歴を読み出せなかった（コネクションは登録解除済み）
    #[error("history unavailable: {0}")]
    HistoryUnavailable(String),
}

/// メッセージ送信のエラー
///
/// いずれもそのメッセージ 1 件に閉じたエラーで、コネクションは継続する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// 前後の空白を除くと本文が空（永続化もブロードキャストもしない）
    #[error("message body is empty")]
    EmptyBody,

    /// 永続化に失敗した（ブロードキャストしない）
    #[error("message store unavailable: {0}")]
    StoreUnavailable(String),

    /// シャットダウン中のため受け付けない（永続化もブロードキャストもしない）
    #[error("server is shutting down")]
    ShuttingDown,
}
