//! Typed command/event protocol between the sync core and a remote backend.
//!
//! The backend runs in its own tokio task.  Commands flow in over a single
//! mpsc channel; events flow out on per-chat subscription channels handed
//! over in [`RemoteCommand::Subscribe`].  Event delivery order on one
//! subscription channel is the order the backend observed the changes, and
//! the sync engine applies them in exactly that order.

use serde_json::Value;
use tokio::sync::mpsc;

use clubroom_shared::{ChatId, UserId};

use crate::error::RemoteError;

/// Commands sent *into* the remote backend task.
#[derive(Debug)]
pub enum RemoteCommand {
    /// Establish a chat record for a group (or DM when `direct_to` is set).
    /// No-op if the chat already exists.
    CreateChat {
        chat_id: ChatId,
        group_id: String,
        direct_to: Option<UserId>,
    },
    /// Remove a chat record entirely.  Subscribers receive
    /// [`RemoteEvent::ChatRemoved`].
    RemoveChat { chat_id: ChatId },
    /// Write a message record under the chat's `messages` child.
    ///
    /// An empty `messageID` in the record is replaced with a fresh
    /// identifier on write.  Writing an existing identifier overwrites the
    /// full record (last write wins).
    PushMessage { chat_id: ChatId, record: Value },
    /// Overwrite the full record stored at `message_id`.
    UpdateMessage {
        chat_id: ChatId,
        message_id: String,
        record: Value,
    },
    /// Remove a single message record.
    RemoveMessage {
        chat_id: ChatId,
        message_id: String,
    },
    /// Replace the chat's typing-user set.
    SetTyping { chat_id: ChatId, users: Vec<UserId> },
    /// Replace the chat's pinned-message set.
    SetPinned { chat_id: ChatId, pinned: Vec<String> },
    /// Open the event streams for one chat.
    ///
    /// Message child events (added/changed/removed) are filtered to records
    /// whose update timestamp is strictly greater than `after`; existing
    /// records past the cursor are replayed as added events immediately, in
    /// ascending timestamp order.  Metadata value events (typing/pinned)
    /// are unfiltered and fire once with the current value on subscribe.
    Subscribe {
        chat_id: ChatId,
        after: f64,
        events: mpsc::Sender<RemoteEvent>,
    },
    /// Gracefully shut down the backend task.
    Shutdown,
}

/// Events sent *from* the remote backend to a chat subscription.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// A message child appeared past the subscription cursor.  The payload
    /// is the raw record; decoding is the subscriber's concern.
    MessageAdded { chat_id: ChatId, payload: Value },
    /// An existing message child was overwritten.
    MessageChanged { chat_id: ChatId, payload: Value },
    /// A message child was removed.
    MessageRemoved {
        chat_id: ChatId,
        message_id: String,
    },
    /// The typing-user set changed (whole-value, remote authoritative).
    TypingChanged { chat_id: ChatId, users: Vec<UserId> },
    /// The pinned-message set changed (whole-value, remote authoritative).
    PinnedChanged { chat_id: ChatId, pinned: Vec<String> },
    /// The chat record itself was removed.
    ChatRemoved { chat_id: ChatId },
}

/// Cloneable handle over the backend's command channel.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    cmd_tx: mpsc::Sender<RemoteCommand>,
}

impl RemoteHandle {
    pub fn new(cmd_tx: mpsc::Sender<RemoteCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Send a raw command to the backend.
    pub async fn send(&self, cmd: RemoteCommand) -> Result<(), RemoteError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| RemoteError::Disconnected)
    }

    pub async fn create_chat(
        &self,
        chat_id: ChatId,
        group_id: String,
        direct_to: Option<UserId>,
    ) -> Result<(), RemoteError> {
        self.send(RemoteCommand::CreateChat {
            chat_id,
            group_id,
            direct_to,
        })
        .await
    }

    pub async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RemoteError> {
        self.send(RemoteCommand::RemoveChat { chat_id }).await
    }

    pub async fn push_message(&self, chat_id: ChatId, record: Value) -> Result<(), RemoteError> {
        self.send(RemoteCommand::PushMessage { chat_id, record })
            .await
    }

    pub async fn update_message(
        &self,
        chat_id: ChatId,
        message_id: String,
        record: Value,
    ) -> Result<(), RemoteError> {
        self.send(RemoteCommand::UpdateMessage {
            chat_id,
            message_id,
            record,
        })
        .await
    }

    pub async fn set_typing(&self, chat_id: ChatId, users: Vec<UserId>) -> Result<(), RemoteError> {
        self.send(RemoteCommand::SetTyping { chat_id, users }).await
    }

    pub async fn set_pinned(
        &self,
        chat_id: ChatId,
        pinned: Vec<String>,
    ) -> Result<(), RemoteError> {
        self.send(RemoteCommand::SetPinned { chat_id, pinned })
            .await
    }

    /// Open the event streams for `chat_id`, delivering onto `events`.
    pub async fn subscribe(
        &self,
        chat_id: ChatId,
        after: f64,
        events: mpsc::Sender<RemoteEvent>,
    ) -> Result<(), RemoteError> {
        self.send(RemoteCommand::Subscribe {
            chat_id,
            after,
            events,
        })
        .await
    }
}
