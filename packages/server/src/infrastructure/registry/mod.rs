//! Connection Registry の実装
//!
//! - `inmemory`: プロセス内の `RwLock<BTreeMap>` による実装
//! - 将来的に: 複数プロセス間で共有する実装など

pub mod inmemory;

pub use inmemory::InMemoryConnectionRegistry;
