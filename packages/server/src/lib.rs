//! Real-time chat broadcast server library.
//!
//! Clients connect over WebSocket, are replayed the most recent chat history,
//! and then receive every message any client sends, in the order the server
//! persisted them.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
