//! Conversion logic between DTOs and domain entities.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::domain::entity;
use crate::infrastructure::dto::{http, websocket};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<entity::ChatMessage> for websocket::ChatMessageDto {
    fn from(model: entity::ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            sender: model.sender.into_string(),
            body: model.body.into_string(),
            created_at: model.created_at.value(),
        }
    }
}

impl From<entity::ChatMessage> for http::MessageDetailDto {
    fn from(model: entity::ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            sender: model.sender.into_string(),
            body: model.body.into_string(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}
