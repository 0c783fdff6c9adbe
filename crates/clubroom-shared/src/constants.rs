//! Shared constants for the chat sync core.

/// Thread name used for messages that carry no explicit thread label.
pub const GENERAL_THREAD: &str = "general";

/// Replacement text pushed when a message is deleted.  Deletion keeps the
/// record (and its identifier) alive so replies and reactions that point at
/// it stay resolvable.
pub const DELETED_MESSAGE_TEXT: &str = "This message was deleted";

/// Number of trailing messages materialized when a chat or thread is first
/// opened.
pub const INITIAL_WINDOW_SIZE: usize = 10;

/// How many additional messages a single "load older" expansion pulls in.
pub const WINDOW_LOAD_STEP: usize = 200;

/// Sync cursor used when no cached history exists.  Strictly below any
/// valid wall-clock timestamp, so a fresh subscription replays everything.
pub const NO_HIGH_WATER: f64 = -1.0;

/// Debounce applied to thread-partition rebuild requests, in milliseconds.
pub const REBUILD_DEBOUNCE_MS: u64 = 25;
