//! Message Store の実装
//!
//! - `sqlite`: SQLite ファイルへの永続化（本番用）
//! - `inmemory`: プロセス内のみ（`--in-memory` 起動とテスト用）

pub mod inmemory;
pub mod sqlite;

pub use inmemory::InMemoryMessageRepository;
pub use sqlite::SqliteMessageRepository;
