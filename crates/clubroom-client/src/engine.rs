//! Per-chat synchronization against the remote store.
//!
//! For each chat the user opens, the engine bootstraps from the local
//! snapshot cache, computes the high-water-mark cursor, opens the remote
//! event streams strictly after it, and folds every delivered event into
//! the in-memory chat list and back into the cache.  Events for one chat
//! are applied in exactly the order the remote delivers them.
//!
//! Failures below this boundary are absorbed: an undecodable payload is
//! dropped with a warning, a failed snapshot write leaves the cache stale
//! until the next merge.  Nothing throws across into the UI layer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use clubroom_remote::{RemoteEvent, RemoteHandle};
use clubroom_shared::wire;
use clubroom_shared::{Chat, ChatId, UserId};
use clubroom_store::Database;

use crate::error::Result;
use crate::reconcile;

/// Capacity of one chat's event stream.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The chat synchronization engine.
///
/// One instance per process; per-chat subscriptions are idempotent and
/// live for the process lifetime once established.
pub struct SyncEngine {
    pub(crate) remote: RemoteHandle,
    pub(crate) store: Mutex<Database>,
    pub(crate) chats: Mutex<HashMap<ChatId, Chat>>,
    pub(crate) chats_tx: watch::Sender<Vec<Chat>>,
    subscribed: Mutex<HashSet<ChatId>>,
}

impl SyncEngine {
    /// Create an engine over a remote handle and an open snapshot store.
    pub fn new(remote: RemoteHandle, store: Database) -> Arc<Self> {
        let (chats_tx, _) = watch::channel(Vec::new());
        Arc::new(Self {
            remote,
            store: Mutex::new(store),
            chats: Mutex::new(HashMap::new()),
            chats_tx,
            subscribed: Mutex::new(HashSet::new()),
        })
    }

    /// Reactive view of the in-memory chat list, newest-activity first.
    pub fn chats(&self) -> watch::Receiver<Vec<Chat>> {
        self.chats_tx.subscribe()
    }

    /// Snapshot of one chat's current in-memory state.
    pub fn chat(&self, chat_id: &ChatId) -> Option<Chat> {
        match self.chats.lock() {
            Ok(chats) => chats.get(chat_id).cloned(),
            Err(_) => None,
        }
    }

    /// Clone of the remote handle, for callers that push directly.
    pub fn remote(&self) -> RemoteHandle {
        self.remote.clone()
    }

    /// Open a chat: bootstrap from cache, subscribe to remote events past
    /// the high-water mark, and keep both mirrors updated.
    ///
    /// Idempotent — re-opening an already-subscribed chat is a no-op.
    /// `group_id` and `direct_to` seed the chat record only when nothing
    /// is cached yet.
    pub async fn open_chat(
        self: &Arc<Self>,
        chat_id: ChatId,
        group_id: impl Into<String>,
        direct_to: Option<UserId>,
    ) -> Result<()> {
        {
            let mut subscribed = match self.subscribed.lock() {
                Ok(s) => s,
                Err(_) => return Ok(()),
            };
            if !subscribed.insert(chat_id.clone()) {
                debug!(chat = %chat_id, "chat already subscribed");
                return Ok(());
            }
        }

        // Bootstrap: adopt the cached snapshot immediately so the UI has
        // something to show before the network responds.  A read failure
        // is a cache miss, never fatal.
        let cached = {
            let store = match self.store.lock() {
                Ok(s) => s,
                Err(_) => return Ok(()),
            };
            match store.load_chat(&chat_id) {
                Ok(chat) => chat,
                Err(e) => {
                    warn!(chat = %chat_id, error = %e, "cache read failed, starting empty");
                    None
                }
            }
        };

        let chat = cached.unwrap_or_else(|| Chat::new(chat_id.clone(), group_id, direct_to));
        let cursor = chat.high_water_mark();

        if let Ok(mut chats) = self.chats.lock() {
            chats.insert(chat_id.clone(), chat);
        }
        self.publish();

        let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.remote
            .subscribe(chat_id.clone(), cursor, events_tx)
            .await?;

        info!(chat = %chat_id, cursor, "chat subscribed");

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                engine.apply_event(event);
            }
            debug!(chat = %chat_id, "event stream closed");
        });

        Ok(())
    }

    /// Fold one remote event into the in-memory state and the cache.
    fn apply_event(&self, event: RemoteEvent) {
        match event {
            RemoteEvent::MessageAdded { chat_id, payload } => {
                self.apply_message(chat_id, payload, false);
            }
            RemoteEvent::MessageChanged { chat_id, payload } => {
                self.apply_message(chat_id, payload, true);
            }
            RemoteEvent::MessageRemoved {
                chat_id,
                message_id,
            } => {
                self.mutate_chat(&chat_id, |chat| {
                    reconcile::merge_removed(&mut chat.messages, &message_id);
                });
            }
            RemoteEvent::TypingChanged { chat_id, users } => {
                self.mutate_chat(&chat_id, |chat| chat.typing_users = users);
            }
            RemoteEvent::PinnedChanged { chat_id, pinned } => {
                self.mutate_chat(&chat_id, |chat| chat.pinned = pinned);
            }
            RemoteEvent::ChatRemoved { chat_id } => {
                self.remove_chat_locally(&chat_id);
            }
        }
    }

    /// Decode and merge an added/changed message event.  Undecodable
    /// payloads are dropped so one bad record cannot stall the stream.
    fn apply_message(&self, chat_id: ChatId, payload: Value, changed: bool) {
        let message = match wire::decode_message(&payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(chat = %chat_id, error = %e, "dropping undecodable message event");
                return;
            }
        };

        let updated = message.effective_updated();
        self.mutate_chat(&chat_id, |chat| {
            if changed {
                reconcile::merge_changed(&mut chat.messages, message);
            } else {
                reconcile::merge_added(&mut chat.messages, message);
            }
            if updated > chat.last_updated {
                chat.last_updated = updated;
            }
        });
    }

    /// Apply `mutate` to a tracked chat, then persist and publish the
    /// result.  Events for chats no longer tracked are ignored.
    pub(crate) fn mutate_chat(&self, chat_id: &ChatId, mutate: impl FnOnce(&mut Chat)) {
        let snapshot = {
            let mut chats = match self.chats.lock() {
                Ok(c) => c,
                Err(_) => return,
            };
            let Some(chat) = chats.get_mut(chat_id) else {
                debug!(chat = %chat_id, "event for untracked chat ignored");
                return;
            };
            mutate(chat);
            chat.clone()
        };

        self.persist(&snapshot);
        self.publish();
    }

    /// Handle an explicit chat-removal event: drop in-memory state and
    /// evict the on-disk snapshot.
    fn remove_chat_locally(&self, chat_id: &ChatId) {
        if let Ok(mut chats) = self.chats.lock() {
            chats.remove(chat_id);
        }
        if let Ok(mut subscribed) = self.subscribed.lock() {
            subscribed.remove(chat_id);
        }
        if let Ok(store) = self.store.lock() {
            if let Err(e) = store.evict_chat(chat_id) {
                warn!(chat = %chat_id, error = %e, "failed to evict chat snapshot");
            }
        }
        info!(chat = %chat_id, "chat removed");
        self.publish();
    }

    fn persist(&self, chat: &Chat) {
        let store = match self.store.lock() {
            Ok(s) => s,
            Err(_) => return,
        };
        if let Err(e) = store.save_chat(chat) {
            warn!(chat = %chat.chat_id, error = %e, "failed to persist chat snapshot");
        }
    }

    /// Push the current chat list to observers, newest activity first.
    pub(crate) fn publish(&self) {
        let mut list: Vec<Chat> = match self.chats.lock() {
            Ok(chats) => chats.values().cloned().collect(),
            Err(_) => return,
        };
        list.sort_by(|a, b| {
            b.last_updated
                .total_cmp(&a.last_updated)
                .then_with(|| a.chat_id.0.cmp(&b.chat_id.0))
        });
        self.chats_tx.send_replace(list);
    }
}
