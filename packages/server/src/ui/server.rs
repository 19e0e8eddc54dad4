//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetMessageHistoryUseCase,
    SendMessageUseCase,
};

use super::{
    handler::{get_messages, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat server
///
/// This struct encapsulates the use cases and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     send_message_usecase,
///     get_message_history_usecase,
/// );
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    send_message_usecase: Arc<SendMessageUseCase>,
    /// GetMessageHistoryUseCase（履歴取得のユースケース）
    get_message_history_usecase: Arc<GetMessageHistoryUseCase>,
}

impl Server {
    /// Create a new Server instance
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        get_message_history_usecase: Arc<GetMessageHistoryUseCase>,
    ) -> Self {
        Self {
            connect_participant_usecase,
            disconnect_participant_usecase,
            send_message_usecase,
            get_message_history_usecase,
        }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            connect_participant_usecase: self.connect_participant_usecase.clone(),
            disconnect_participant_usecase: self.disconnect_participant_usecase.clone(),
            send_message_usecase: self.send_message_usecase.clone(),
            get_message_history_usecase: self.get_message_history_usecase.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/messages", get(get_messages))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the WebSocket chat server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(bind_addr).await?;

        tracing::info!("Connect to: ws://{}/ws", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown, in-flight sends finish first and later sends are refused.
    /// Then every connection is deregistered so its outbound pump flushes what
    /// is queued and closes the socket.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let send_message_usecase = self.send_message_usecase.clone();
        let disconnect_participant_usecase = self.disconnect_participant_usecase.clone();

        tracing::info!(
            "WebSocket chat server listening on {}",
            listener.local_addr()?
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                // No message is appended once drain returns
                send_message_usecase.drain().await;
                disconnect_participant_usecase.disconnect_all().await;
            })
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
