//! UseCase 層
//!
//! コネクションごとのライフサイクル（接続・履歴リプレイ・送信・切断）を
//! Message Store と Connection Registry の組み合わせとして実装します。

pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_message_history;
pub mod send_message;

pub use connect_participant::{ConnectParticipantUseCase, JoinedConnection, LiveFeed};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{ConnectError, SendMessageError};
pub use get_message_history::GetMessageHistoryUseCase;
pub use send_message::{BroadcastReport, SendMessageUseCase};
