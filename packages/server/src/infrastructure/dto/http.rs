//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// Query parameters for `GET /api/messages`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// A stored message as returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetailDto {
    pub id: i64,
    pub sender: String,
    pub body: String,
    /// RFC 3339 (UTC)
    pub created_at: String,
}

/// Response body of `GET /api/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHistoryDto {
    pub messages: Vec<MessageDetailDto>,
}
