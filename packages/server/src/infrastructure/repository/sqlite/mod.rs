//! `SQLite` backend for the Message Store.
//!
//! - **[`connection`]**: `r2d2` connection pool with WAL mode and busy timeout
//!   applied to every connection.
//! - **[`migrations`]**: version-tracked schema, embedded at compile time and
//!   applied transactionally.
//! - **[`message`]**: the `MessageRepository` implementation. Blocking SQLite
//!   calls run on the blocking thread pool.

pub mod connection;
pub mod error;
pub mod message;
pub mod migrations;

pub use connection::{
    ConnectionConfig, ConnectionPool, DEFAULT_POOL_SIZE, new_file, new_in_memory,
};
pub use error::SqliteStoreError;
pub use message::SqliteMessageRepository;
pub use migrations::{current_version, run_migrations};
