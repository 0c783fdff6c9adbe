//! # clubroom-remote
//!
//! The remote keyed-event-store boundary.
//!
//! The sync core never talks to a concrete backend directly: it holds a
//! [`RemoteHandle`] over a typed command channel, and receives
//! [`RemoteEvent`]s on per-chat subscription channels.  Any task that
//! consumes [`RemoteCommand`]s and honors the contract documented on them
//! can sit behind the handle; [`spawn_memory_remote`] provides a complete
//! in-process reference backend used by tests and offline development.

pub mod memory;
pub mod protocol;

mod error;

pub use error::RemoteError;
pub use memory::spawn_memory_remote;
pub use protocol::{RemoteCommand, RemoteEvent, RemoteHandle};
