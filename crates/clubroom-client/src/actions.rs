//! Outgoing user actions: send, edit, delete, react, flag, plus chat and
//! thread creation.
//!
//! Every operation constructs or mutates a full message record and pushes
//! it to the remote store; the engine's own subscription is the path by
//! which the authoritative result comes back (the reconciler's identifier
//! check deduplicates the local echo).  Pushes are fire-and-forget:
//! failures are logged and never block further local interaction.

use std::sync::Arc;

use tracing::{debug, warn};

use clubroom_shared::constants::DELETED_MESSAGE_TEXT;
use clubroom_shared::{now_ts, wire, ChatId, ChatMessage, UserId};

use crate::engine::SyncEngine;
use crate::error::Result;

impl SyncEngine {
    /// Send a new message.  The identifier is left empty for the remote
    /// store to assign on write.
    pub async fn send_message(
        &self,
        chat_id: &ChatId,
        sender: UserId,
        text: &str,
        thread_name: Option<String>,
        reply_to: Option<String>,
        attachment_url: Option<String>,
    ) {
        let mut message = ChatMessage::outgoing(sender, text, now_ts());
        message.thread_name = thread_name;
        message.reply_to = reply_to;
        message.attachment_url = attachment_url;

        if let Err(e) = self
            .remote
            .push_message(chat_id.clone(), wire::encode_message(&message))
            .await
        {
            warn!(chat = %chat_id, error = %e, "failed to push message");
        }
    }

    /// Create a named thread by sending its system-generated opening
    /// notice.
    pub async fn create_thread(&self, chat_id: &ChatId, creator: UserId, thread_name: &str) {
        let mut notice = ChatMessage::outgoing(
            creator.clone(),
            format!("{creator} started the thread \"{thread_name}\""),
            now_ts(),
        );
        notice.thread_name = Some(thread_name.to_string());
        notice.system_generated = Some(true);

        if let Err(e) = self
            .remote
            .push_message(chat_id.clone(), wire::encode_message(&notice))
            .await
        {
            warn!(chat = %chat_id, thread = thread_name, error = %e, "failed to create thread");
        }
    }

    /// Replace the text of an existing message.  No-op if the chat or
    /// message can no longer be found locally (concurrent deletion).
    pub async fn edit_message(&self, chat_id: &ChatId, message_id: &str, new_text: &str) {
        let text = new_text.to_string();
        self.mutate_and_push(chat_id, message_id, move |m| m.message = text)
            .await;
    }

    /// Delete a message: a text replacement to the deleted sentinel, not a
    /// record removal, so replies and reactions referencing it stay
    /// resolvable.
    pub async fn delete_message(&self, chat_id: &ChatId, message_id: &str) {
        self.mutate_and_push(chat_id, message_id, |m| {
            m.message = DELETED_MESSAGE_TEXT.to_string();
        })
        .await;
    }

    /// Toggle `user`'s reaction with `emoji` on a message.
    pub async fn toggle_reaction(
        &self,
        chat_id: &ChatId,
        message_id: &str,
        emoji: &str,
        user: UserId,
    ) {
        let emoji = emoji.to_string();
        self.mutate_and_push(chat_id, message_id, move |m| {
            m.toggle_reaction(&emoji, &user);
        })
        .await;
    }

    /// Report a message (`flagged = true`) or mark it reviewed-safe
    /// (`flagged = false`).
    pub async fn set_flagged(&self, chat_id: &ChatId, message_id: &str, flagged: bool) {
        self.mutate_and_push(chat_id, message_id, move |m| m.flagged = Some(flagged))
            .await;
    }

    /// Replace this chat's typing-user set on the remote.
    pub async fn publish_typing(&self, chat_id: &ChatId, users: Vec<UserId>) {
        if let Err(e) = self.remote.set_typing(chat_id.clone(), users).await {
            warn!(chat = %chat_id, error = %e, "failed to publish typing set");
        }
    }

    /// Replace this chat's pinned-message set on the remote.
    pub async fn publish_pinned(&self, chat_id: &ChatId, pinned: Vec<String>) {
        if let Err(e) = self.remote.set_pinned(chat_id.clone(), pinned).await {
            warn!(chat = %chat_id, error = %e, "failed to publish pinned set");
        }
    }

    /// Establish a chat record remotely and open it locally.
    pub async fn create_chat(
        self: &Arc<Self>,
        chat_id: ChatId,
        group_id: String,
        direct_to: Option<UserId>,
    ) -> Result<()> {
        self.remote
            .create_chat(chat_id.clone(), group_id.clone(), direct_to.clone())
            .await?;
        self.open_chat(chat_id, group_id, direct_to).await
    }

    /// Remove a chat record remotely.  Local state and the cached snapshot
    /// are dropped when the removal event comes back on the subscription.
    pub async fn remove_chat(&self, chat_id: &ChatId) {
        if let Err(e) = self.remote.remove_chat(chat_id.clone()).await {
            warn!(chat = %chat_id, error = %e, "failed to remove chat");
        }
    }

    /// Locate a message, apply `mutate` locally (direct local mutation
    /// before push), bump its update timestamp, and push the full record.
    async fn mutate_and_push(
        &self,
        chat_id: &ChatId,
        message_id: &str,
        mutate: impl FnOnce(&mut ChatMessage),
    ) {
        let mut record = None;
        self.mutate_chat(chat_id, |chat| {
            let Some(message) = chat.message_mut(message_id) else {
                debug!(chat = %chat_id, msg_id = message_id, "message no longer present, skipping");
                return;
            };
            mutate(message);
            message.last_updated = Some(now_ts());
            record = Some(wire::encode_message(message));
        });

        let Some(record) = record else {
            return;
        };
        if let Err(e) = self
            .remote
            .update_message(chat_id.clone(), message_id.to_string(), record)
            .await
        {
            warn!(chat = %chat_id, msg_id = message_id, error = %e, "failed to push message update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{open_test_engine, wait_for_chat};

    async fn open_and_send(
        engine: &Arc<SyncEngine>,
        chat_id: &ChatId,
        text: &str,
    ) -> clubroom_shared::Chat {
        engine
            .open_chat(chat_id.clone(), "club-42", None)
            .await
            .unwrap();
        engine
            .send_message(chat_id, UserId::from("alice"), text, None, None, None)
            .await;
        wait_for_chat(engine, chat_id, |c| !c.messages.is_empty()).await
    }

    #[tokio::test]
    async fn sent_message_echoes_back_with_assigned_id() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        let chat = open_and_send(&engine, &chat_id, "hello club").await;

        assert_eq!(chat.messages.len(), 1);
        let message = &chat.messages[0];
        assert!(!message.message_id.is_empty());
        assert_eq!(message.message, "hello club");
        assert_eq!(message.thread(), "general");
    }

    #[tokio::test]
    async fn sending_again_does_not_duplicate_the_echo() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        open_and_send(&engine, &chat_id, "one").await;
        engine
            .send_message(&chat_id, UserId::from("alice"), "two", None, None, None)
            .await;

        let chat = wait_for_chat(&engine, &chat_id, |c| c.messages.len() == 2).await;
        assert_eq!(chat.messages.len(), 2);
    }

    #[tokio::test]
    async fn edit_replaces_text_via_subscription() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        let chat = open_and_send(&engine, &chat_id, "tpyo").await;
        let message_id = chat.messages[0].message_id.clone();

        engine.edit_message(&chat_id, &message_id, "typo").await;

        let chat = wait_for_chat(&engine, &chat_id, |c| {
            c.message(&message_id).map(|m| m.message.as_str()) == Some("typo")
        })
        .await;
        assert_eq!(chat.messages.len(), 1);
    }

    #[tokio::test]
    async fn delete_sets_sentinel_and_keeps_record() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        let chat = open_and_send(&engine, &chat_id, "regrettable").await;
        let message_id = chat.messages[0].message_id.clone();

        engine.delete_message(&chat_id, &message_id).await;

        let chat = wait_for_chat(&engine, &chat_id, |c| {
            c.message(&message_id).map(|m| m.message.as_str()) == Some(DELETED_MESSAGE_TEXT)
        })
        .await;
        // The record survives under the same identifier.
        assert_eq!(chat.messages[0].message_id, message_id);
    }

    #[tokio::test]
    async fn reaction_toggle_round_trips_through_the_pipeline() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        let chat = open_and_send(&engine, &chat_id, "party friday").await;
        let message_id = chat.messages[0].message_id.clone();

        engine
            .toggle_reaction(&chat_id, &message_id, "🎉", UserId::from("bob"))
            .await;
        wait_for_chat(&engine, &chat_id, |c| {
            c.message(&message_id)
                .and_then(|m| m.reactions.as_ref())
                .is_some()
        })
        .await;

        engine
            .toggle_reaction(&chat_id, &message_id, "🎉", UserId::from("bob"))
            .await;
        let chat = wait_for_chat(&engine, &chat_id, |c| {
            c.message(&message_id)
                .map(|m| m.reactions.is_none())
                .unwrap_or(false)
        })
        .await;
        assert!(chat.messages[0].reactions.is_none());
    }

    #[tokio::test]
    async fn flag_then_mark_safe() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        let chat = open_and_send(&engine, &chat_id, "spam?").await;
        let message_id = chat.messages[0].message_id.clone();

        engine.set_flagged(&chat_id, &message_id, true).await;
        wait_for_chat(&engine, &chat_id, |c| {
            c.message(&message_id).and_then(|m| m.flagged) == Some(true)
        })
        .await;

        engine.set_flagged(&chat_id, &message_id, false).await;
        wait_for_chat(&engine, &chat_id, |c| {
            c.message(&message_id).and_then(|m| m.flagged) == Some(false)
        })
        .await;
    }

    #[tokio::test]
    async fn editing_a_missing_message_is_a_silent_noop() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        open_and_send(&engine, &chat_id, "only message").await;
        engine.edit_message(&chat_id, "no-such-id", "ghost").await;

        let chat = engine.chat(&chat_id).unwrap();
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].message, "only message");
    }

    #[tokio::test]
    async fn thread_creation_sends_system_notice() {
        let (engine, _remote, _dir) = open_test_engine();
        let chat_id = ChatId::from("c1");

        engine
            .open_chat(chat_id.clone(), "club-42", None)
            .await
            .unwrap();
        engine
            .create_thread(&chat_id, UserId::from("alice"), "events")
            .await;

        let chat = wait_for_chat(&engine, &chat_id, |c| !c.messages.is_empty()).await;
        let notice = &chat.messages[0];
        assert_eq!(notice.thread(), "events");
        assert_eq!(notice.system_generated, Some(true));
    }
}
