//! # clubroom-client
//!
//! The chat synchronization core: incremental mirroring of remote chat
//! records into an in-memory chat list and an on-disk snapshot cache, plus
//! the derived view state (thread partitions, visible windows) the UI
//! layer renders from.
//!
//! The pieces compose leaf-first:
//!
//! - [`reconcile`] — pure merge of one remote child event into an ordered
//!   message collection.
//! - [`partition`] — thread-scoped message subsets and the whole-chat
//!   reply-lookup index.
//! - [`window`] — the trailing visible-window state machine.
//! - [`engine`] — per-chat subscriptions: cache bootstrap, high-water-mark
//!   cursor, merge/persist/publish.
//! - [`actions`] — outgoing send/edit/delete/react/flag pushes, observed
//!   back through the engine's own subscription.
//! - [`session`] — the explicit selection context (no singletons): selected
//!   chat/thread, per-thread windows, generation-counted partition rebuilds.

pub mod actions;
pub mod engine;
pub mod partition;
pub mod reconcile;
pub mod session;
pub mod window;

mod error;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::SyncEngine;
pub use error::ClientError;
pub use partition::ThreadPartition;
pub use session::Session;
pub use window::VisibleWindow;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide tracing subscriber.  Call once at startup from
/// the embedding application.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("clubroom_client=debug,clubroom_remote=debug,clubroom_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
