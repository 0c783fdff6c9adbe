//! # clubroom-shared
//!
//! Domain model and wire types shared between the sync core, the local
//! store, and the remote-store boundary.
//!
//! Every type that crosses a crate boundary derives `Serialize` and
//! `Deserialize`; the serde renames on [`models::ChatMessage`] and
//! [`models::Chat`] pin the exact field names the remote store uses.

pub mod constants;
pub mod models;
pub mod types;
pub mod wire;

mod error;

pub use error::DecodeError;
pub use models::{Chat, ChatMessage, Reactions};
pub use types::{now_ts, ChatId, UserId};
