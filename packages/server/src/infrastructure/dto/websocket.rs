//! WebSocket message DTOs.
//!
//! Inbound frames carry `{"sender": "...", "body": "..."}`. The field names
//! `username` / `text` are accepted as aliases for older clients.
//! Outbound frames (history replay and live broadcast) carry the stored
//! record including its id and creation time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundChatMessage {
    #[serde(alias = "username")]
    pub sender: String,
    #[serde(alias = "text")]
    pub body: String,
}

/// Message delivered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub id: i64,
    pub sender: String,
    pub body: String,
    /// Unix timestamp in UTC (milliseconds)
    pub created_at: i64,
}

/// Inbound payload that cannot be accepted. The connection is closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// Not JSON, or a required field is missing / has the wrong type
    #[error("malformed chat message: {0}")]
    Malformed(String),

    /// Binary frames are not part of the protocol
    #[error("unsupported frame type")]
    UnsupportedFrame,
}

/// Parse an inbound text frame.
pub fn parse_inbound(text: &str) -> Result<InboundChatMessage, ProtocolViolation> {
    serde_json::from_str(text).map_err(|e| ProtocolViolation::Malformed(e.to_string()))
}
