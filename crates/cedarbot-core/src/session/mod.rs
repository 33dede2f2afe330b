//! Session lifecycle — one active identity pair per conversation.
//!
//! Sessions live only in memory; nothing is persisted across restarts.

pub mod manager;

pub use manager::SessionManager;
