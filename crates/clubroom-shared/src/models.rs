//! Domain model structs mirrored between the remote store, the local
//! snapshot cache, and the in-memory chat list.
//!
//! The serde attributes pin the wire field names exactly; a `Chat` or
//! `ChatMessage` serialized with `serde_json` is byte-compatible with the
//! records the remote store holds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::GENERAL_THREAD;
use crate::types::{ChatId, UserId};

/// Per-emoji reaction lists: emoji symbol to the ordered, de-duplicated
/// user identifiers that reacted with it.
pub type Reactions = BTreeMap<String, Vec<UserId>>;

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// A single chat message as stored in the remote `messages` child.
///
/// `message_id` is remote-assigned: a freshly constructed outgoing message
/// carries an empty identifier until the backing store replaces it on write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "messageID")]
    pub message_id: String,
    /// Text body.
    pub message: String,
    /// Sender identifier.
    pub sender: UserId,
    /// Send timestamp, seconds since epoch.
    pub date: f64,
    /// Last-updated timestamp used for incremental sync ordering.
    /// Absent means the message was never edited; see [`Self::effective_updated`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<f64>,
    /// Thread label; absence means the implicit "general" thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    /// Identifier of the message this one replies to (may live in a
    /// different thread).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(rename = "attachmentURL", skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    /// Tri-state moderation flag: absent = never reported, `true` =
    /// reported and pending review, `false` = reviewed safe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// Set on messages the system itself produces (e.g. thread creation
    /// notices) rather than a user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_generated: Option<bool>,
}

impl ChatMessage {
    /// Construct an outgoing user message.  The identifier is left empty
    /// for the remote store to assign on write.
    pub fn outgoing(sender: UserId, text: impl Into<String>, date: f64) -> Self {
        Self {
            message_id: String::new(),
            message: text.into(),
            sender,
            date,
            last_updated: Some(date),
            thread_name: None,
            reply_to: None,
            attachment_url: None,
            reactions: None,
            flagged: None,
            system_generated: None,
        }
    }

    /// Timestamp used for sync ordering; falls back to the send timestamp
    /// when the message was never updated.
    pub fn effective_updated(&self) -> f64 {
        self.last_updated.unwrap_or(self.date)
    }

    /// Thread this message belongs to, defaulting to "general".
    pub fn thread(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(GENERAL_THREAD)
    }

    /// Toggle `user`'s reaction with `emoji`: remove it if present, append
    /// it if absent.  An emoji whose list becomes empty is removed entirely,
    /// and an empty map collapses back to `None`.
    pub fn toggle_reaction(&mut self, emoji: &str, user: &UserId) {
        let reactions = self.reactions.get_or_insert_with(Reactions::new);
        let users = reactions.entry(emoji.to_string()).or_default();

        if let Some(pos) = users.iter().position(|u| u == user) {
            users.remove(pos);
        } else {
            users.push(user.clone());
        }

        if users.is_empty() {
            reactions.remove(emoji);
        }
        if reactions.is_empty() {
            self.reactions = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat record: one group (or DM) conversation with its full message
/// history and chat-level metadata.
///
/// Invariant: `messages` is kept sorted ascending by `date` after any
/// mutation (the reconciler re-sorts on every merge).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "chatID")]
    pub chat_id: ChatId,
    /// Identifier of the club/group that owns this chat.
    #[serde(rename = "groupID")]
    pub group_id: String,
    /// For DM chats, the identifier of the other party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_to: Option<UserId>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Users currently typing; remote is authoritative, replaced wholesale.
    #[serde(default)]
    pub typing_users: Vec<UserId>,
    /// Identifiers of pinned messages; remote is authoritative.
    #[serde(default)]
    pub pinned: Vec<String>,
    /// Timestamp of the newest change observed on this chat.
    #[serde(default)]
    pub last_updated: f64,
}

impl Chat {
    pub fn new(chat_id: ChatId, group_id: impl Into<String>, direct_to: Option<UserId>) -> Self {
        Self {
            chat_id,
            group_id: group_id.into(),
            direct_to,
            messages: Vec::new(),
            typing_users: Vec::new(),
            pinned: Vec::new(),
            last_updated: 0.0,
        }
    }

    /// Sync cursor for this chat: the newest `effective_updated` across all
    /// cached messages, or [`crate::constants::NO_HIGH_WATER`] when no
    /// history is cached.  Remote subscriptions start strictly after this.
    pub fn high_water_mark(&self) -> f64 {
        self.messages
            .iter()
            .map(ChatMessage::effective_updated)
            .fold(crate::constants::NO_HIGH_WATER, f64::max)
    }

    /// Look up a message by identifier.
    pub fn message(&self, message_id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.message_id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.message_id == message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NO_HIGH_WATER;

    fn msg(id: &str, date: f64) -> ChatMessage {
        ChatMessage {
            message_id: id.to_string(),
            message: format!("body {id}"),
            sender: UserId::from("alice"),
            date,
            last_updated: None,
            thread_name: None,
            reply_to: None,
            attachment_url: None,
            reactions: None,
            flagged: None,
            system_generated: None,
        }
    }

    #[test]
    fn effective_updated_falls_back_to_date() {
        let mut m = msg("a", 100.0);
        assert_eq!(m.effective_updated(), 100.0);
        m.last_updated = Some(150.0);
        assert_eq!(m.effective_updated(), 150.0);
    }

    #[test]
    fn thread_defaults_to_general() {
        let mut m = msg("a", 100.0);
        assert_eq!(m.thread(), "general");
        m.thread_name = Some("events".into());
        assert_eq!(m.thread(), "events");
    }

    #[test]
    fn reaction_toggle_round_trips() {
        let mut m = msg("a", 100.0);
        let bob = UserId::from("bob");

        m.toggle_reaction("👍", &bob);
        assert_eq!(
            m.reactions.as_ref().unwrap().get("👍").unwrap(),
            &vec![bob.clone()]
        );

        m.toggle_reaction("👍", &bob);
        assert!(m.reactions.is_none());
    }

    #[test]
    fn reaction_toggle_preserves_other_emojis() {
        let mut m = msg("a", 100.0);
        let bob = UserId::from("bob");
        let carol = UserId::from("carol");

        m.toggle_reaction("👍", &bob);
        m.toggle_reaction("🎉", &carol);
        m.toggle_reaction("👍", &bob);

        let reactions = m.reactions.as_ref().unwrap();
        assert!(!reactions.contains_key("👍"));
        assert_eq!(reactions.get("🎉").unwrap(), &vec![carol]);
    }

    #[test]
    fn high_water_mark_uses_newest_update() {
        let mut chat = Chat::new(ChatId::from("c1"), "g1", None);
        assert_eq!(chat.high_water_mark(), NO_HIGH_WATER);

        chat.messages.push(msg("a", 100.0));
        let mut edited = msg("b", 90.0);
        edited.last_updated = Some(120.0);
        chat.messages.push(edited);

        assert_eq!(chat.high_water_mark(), 120.0);
    }

    #[test]
    fn wire_field_names_match_remote_schema() {
        let mut m = msg("m-1", 100.0);
        m.attachment_url = Some("https://example.com/a.png".into());
        m.system_generated = Some(true);

        let value = serde_json::to_value(&m).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("messageID"));
        assert!(obj.contains_key("attachmentURL"));
        assert!(obj.contains_key("systemGenerated"));
        assert!(obj.contains_key("date"));
        // Unset optionals are omitted on the wire.
        assert!(!obj.contains_key("threadName"));
        assert!(!obj.contains_key("flagged"));
    }
}
