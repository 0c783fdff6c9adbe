//! # clubroom-store
//!
//! Durable per-chat snapshot cache for the clubroom sync core.
//!
//! Each chat the user has opened is persisted as a single JSON blob keyed
//! by chat identifier.  The crate exposes a synchronous [`Database`] handle
//! that wraps a `rusqlite::Connection`; the sync engine reads a snapshot
//! once at chat-open time and overwrites it after every successful merge.

pub mod database;
pub mod migrations;
pub mod snapshots;

mod error;

pub use database::Database;
pub use error::StoreError;
