//! エンティティ
//!
//! - `ChatMessage`: Message Store に永続化されたチャットメッセージ
//! - `ConnectionHandle`: Connection Registry に登録されるコネクションへの送信口

use tokio::sync::mpsc;

use super::{
    error::DeliveryError,
    value_object::{ConnectionId, MessageBody, MessageId, SenderName, Timestamp},
};

/// 永続化済みのチャットメッセージ
///
/// 追記時に ID とタイムスタンプが確定し、以後は変更されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: SenderName,
    pub body: MessageBody,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(id: MessageId, sender: SenderName, body: MessageBody, created_at: Timestamp) -> Self {
        Self {
            id,
            sender,
            body,
            created_at,
        }
    }
}

/// コネクションの状態
///
/// `Joining -> Live -> Closed` の順にのみ遷移する。Closed は終端状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 登録済み、履歴のリプレイ中
    Joining,
    /// リプレイ完了、ライブ配信中
    Live,
    /// 切断済み（レジストリに存在しない）
    Closed,
}

/// コネクションへの送信口
///
/// `outbound` は容量制限付きのキュー。ブロードキャスト側は決して待たず、
/// キューが満杯のコネクションは配信失敗として扱われる。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    outbound: mpsc::Sender<ChatMessage>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<ChatMessage>) -> Self {
        Self { id, outbound }
    }

    /// メッセージを送信キューに積む（非ブロッキング）
    pub fn push(&self, message: ChatMessage) -> Result<(), DeliveryError> {
        self.outbound.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::BufferFull(self.id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        })
    }
}
