//! ドメイン層
//!
//! チャットメッセージとコネクションのモデル、および Infrastructure 層が実装する
//! インターフェース（`MessageRepository`, `ConnectionRegistry`）を定義します。

pub mod entity;
pub mod error;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, ConnectionHandle, ConnectionState};
pub use error::{DeliveryError, RepositoryError, ValueObjectError};
pub use registry::ConnectionRegistry;
pub use repository::MessageRepository;
pub use value_object::{ConnectionId, ConnectionIdFactory, MessageBody, MessageId, SenderName, Timestamp};
