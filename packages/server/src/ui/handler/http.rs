//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::http::{HistoryQuery, MessageDetailDto, MessageHistoryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get the most recent messages, oldest first
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessageHistoryDto>, StatusCode> {
    match state.get_message_history_usecase.execute(query.limit).await {
        Ok(messages) => {
            // Domain Model から DTO への変換
            let messages: Vec<MessageDetailDto> =
                messages.into_iter().map(MessageDetailDto::from).collect();
            Ok(Json(MessageHistoryDto { messages }))
        }
        Err(e) => {
            tracing::warn!("Failed to load message history: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
