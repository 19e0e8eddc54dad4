//! Infrastructure 層
//!
//! - `repository`: Message Store の実装（SQLite / インメモリ）
//! - `registry`: Connection Registry の実装
//! - `dto`: WebSocket / HTTP のデータ転送オブジェクト

pub mod dto;
pub mod registry;
pub mod repository;
