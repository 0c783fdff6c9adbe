use thiserror::Error;

/// Errors produced by the store layer.
///
/// Note that a corrupt snapshot payload is *not* an error: `load_chat`
/// treats it as a cache miss so the sync engine can proceed from empty
/// state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization failure on save.
    #[error("Snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
