//! Thread partitioning: derive the message subset of one named thread and
//! the whole-chat reply-lookup index.
//!
//! Pure functions over a chat snapshot, safe to run on a blocking worker.
//! Staleness against newer snapshots is handled by the caller via the
//! generation counter on [`ThreadPartition`] (see [`crate::session`]).

use std::collections::HashMap;

use clubroom_shared::constants::GENERAL_THREAD;
use clubroom_shared::{Chat, ChatId, ChatMessage};

/// The derived view state for one (chat, thread) selection.
#[derive(Debug, Clone)]
pub struct ThreadPartition {
    pub chat_id: ChatId,
    pub thread: String,
    /// Messages of the selected thread, in chat order (ascending by date).
    pub messages: Vec<ChatMessage>,
    /// Identifier lookup across the *entire* chat, not just this thread: a
    /// reply may reference a message in a different thread.
    pub index: HashMap<String, ChatMessage>,
    /// Generation the rebuild was requested at; stale results are
    /// discarded by the session before publication.
    pub generation: u64,
}

/// Filter `chat`'s messages to the requested thread (preserving relative
/// order) and build the whole-chat identifier index.
pub fn partition(chat: &Chat, thread: &str) -> (Vec<ChatMessage>, HashMap<String, ChatMessage>) {
    let messages: Vec<ChatMessage> = chat
        .messages
        .iter()
        .filter(|m| m.thread() == thread)
        .cloned()
        .collect();

    let index: HashMap<String, ChatMessage> = chat
        .messages
        .iter()
        .map(|m| (m.message_id.clone(), m.clone()))
        .collect();

    (messages, index)
}

/// Distinct thread names of a chat, "general" always first (even with no
/// messages), the rest in first-appearance order.
pub fn thread_names(chat: &Chat) -> Vec<String> {
    let mut names = vec![GENERAL_THREAD.to_string()];
    for message in &chat.messages {
        let thread = message.thread();
        if !names.iter().any(|n| n == thread) {
            names.push(thread.to_string());
        }
    }
    names
}

/// Count the messages of one thread without materializing the partition.
/// Used for window resets at selection time.
pub fn thread_len(chat: &Chat, thread: &str) -> usize {
    chat.messages.iter().filter(|m| m.thread() == thread).count()
}
