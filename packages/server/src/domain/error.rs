//! ドメイン層のエラー型

use thiserror::Error;

use super::value_object::ConnectionId;

/// 値オブジェクトの生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    /// 前後の空白を除くと本文が空になる
    #[error("message body is empty after trimming")]
    EmptyMessageBody,

    /// メッセージ ID は 1 以上でなければならない
    #[error("invalid message id: {0}")]
    InvalidMessageId(i64),
}

/// Message Store のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 永続化媒体に書き込めない／読み出せない（StoreUnavailable）
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

/// 特定のコネクションへの配信失敗（DeliveryFailure）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// 送信バッファが満杯（受信が遅すぎるクライアント）
    #[error("outbound buffer of {0} is full")]
    BufferFull(ConnectionId),

    /// 送信先のチャンネルがすでに閉じている
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}
