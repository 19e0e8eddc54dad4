//! Real-time chat broadcast server.
//!
//! Persists every message to SQLite, replays the most recent history to new
//! clients and broadcasts each message to all connected clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --database chat.db
//! cargo run --bin hiroba-server -- --in-memory
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use hiroba_server::{
    config::{
        DEFAULT_DATABASE_PATH, DEFAULT_HISTORY_LIMIT, DEFAULT_HOST, DEFAULT_OUTBOUND_BUFFER,
        DEFAULT_POOL_SIZE, DEFAULT_PORT, DatabaseConfig, ServerConfig,
    },
    domain::{ConnectionRegistry, MessageRepository},
    infrastructure::{
        registry::InMemoryConnectionRegistry,
        repository::{InMemoryMessageRepository, SqliteMessageRepository},
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetMessageHistoryUseCase,
        SendMessageUseCase,
    },
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Real-time chat broadcast server with persistent history", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// SQLite database file
    #[arg(short = 'd', long, default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Keep messages in memory only (nothing is persisted)
    #[arg(long, conflicts_with = "database")]
    in_memory: bool,

    /// Number of recent messages replayed to a joining client
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    /// Capacity of each connection's outbound queue
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_BUFFER)]
    outbound_buffer: usize,

    /// Maximum number of pooled SQLite connections
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
    pool_size: u32,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let database = if args.in_memory {
            DatabaseConfig::InMemory
        } else {
            DatabaseConfig::File {
                path: args.database,
                pool_size: args.pool_size,
            }
        };
        Self {
            host: args.host,
            port: args.port,
            database,
            history_limit: args.history_limit,
            outbound_buffer: args.outbound_buffer,
        }
    }
}

fn open_repository(
    database: &DatabaseConfig,
) -> Result<Arc<dyn MessageRepository>, Box<dyn std::error::Error>> {
    match database {
        DatabaseConfig::File { path, .. } => {
            let repository = SqliteMessageRepository::open_file(
                &path.to_string_lossy(),
                &database.connection_config(),
            )?;
            tracing::info!("Message store opened at {}", path.display());
            Ok(Arc::new(repository))
        }
        DatabaseConfig::InMemory => {
            tracing::warn!("Using in-memory message store, history is lost on exit");
            Ok(Arc::new(InMemoryMessageRepository::new()))
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&["hiroba-server"], env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(Args::parse());

    // Initialize dependencies in order:
    // 1. Repository / Registry
    // 2. UseCases
    // 3. Server

    // 1. Create Repository and Registry
    let repository = match open_repository(&config.database) {
        Ok(repository) => repository,
        Err(e) => {
            tracing::error!("Failed to open message store: {}", e);
            std::process::exit(1);
        }
    };
    let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());

    // 2. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        repository.clone(),
        registry.clone(),
        config.history_limit,
        config.outbound_buffer,
    ));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(registry.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        registry.clone(),
    ));
    let get_message_history_usecase = Arc::new(GetMessageHistoryUseCase::new(repository.clone()));

    // 3. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        get_message_history_usecase,
    );
    if let Err(e) = server.run(&config.bind_addr()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
