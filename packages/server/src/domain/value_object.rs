//! 値オブジェクト
//!
//! 生の文字列・整数をそのまま持ち回らず、生成時に検証・正規化した値として扱います。

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use super::error::ValueObjectError;

/// メッセージ ID
///
/// Message Store が追記時に採番する、1 以上の単調増加する整数。
/// 配信・リプレイの順序はこの値のみで決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(i64);

impl MessageId {
    pub fn new(value: i64) -> Result<Self, ValueObjectError> {
        if value < 1 {
            return Err(ValueObjectError::InvalidMessageId(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 送信者の表示名（前後の空白を除去済み）
///
/// 空文字列も受け付ける。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderName(String);

impl SenderName {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SenderName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// メッセージ本文（前後の空白を除去済み、空でない）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValueObjectError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyMessageBody);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（UTC, ミリ秒）
///
/// 表示用の情報であり、メッセージの順序付けには使わない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// コネクション ID
///
/// プロセス内で一意。一度 Closed になった ID は再利用されない。
/// 値の大小は登録順と一致する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// ConnectionId の採番
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    pub fn generate() -> ConnectionId {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}
