//! Server configuration.

use std::path::PathBuf;

use crate::infrastructure::repository::sqlite::ConnectionConfig;
pub use crate::infrastructure::repository::sqlite::DEFAULT_POOL_SIZE;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_PATH: &str = "messages.db";
/// Number of messages replayed to a joining client
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Where chat messages are persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// SQLite database file
    File { path: PathBuf, pool_size: u32 },
    /// Process-local store, nothing survives a restart
    InMemory,
}

impl DatabaseConfig {
    pub fn connection_config(&self) -> ConnectionConfig {
        match self {
            DatabaseConfig::File { pool_size, .. } => ConnectionConfig {
                pool_size: *pool_size,
                ..ConnectionConfig::default()
            },
            DatabaseConfig::InMemory => ConnectionConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::File {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Runtime settings of the chat server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    /// Number of recent messages replayed to a joining client
    pub history_limit: usize,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DatabaseConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Address passed to the listener, `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
