//! Per-user session context: the selected chat and thread, the visible
//! windows, and the generation-counted partition rebuild pipeline.
//!
//! This is the explicit replacement for process-wide selection state: the
//! top-level application controller owns the `Session` and hands it (by
//! reference or behind its own lock) to whatever consumes derived view
//! state.  Never a singleton.
//!
//! Partition rebuilds are requested explicitly (on selection change and on
//! chat-data change), debounced, run on a blocking worker, and published
//! only if no newer request started in the meantime — a rebuild computed
//! for a superseded chat state or selection is discarded, never applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use clubroom_shared::constants::{GENERAL_THREAD, REBUILD_DEBOUNCE_MS};
use clubroom_shared::{ChatId, ChatMessage, UserId};

use crate::engine::SyncEngine;
use crate::error::Result;
use crate::partition::{self, ThreadPartition};
use crate::window::VisibleWindow;

/// Selection context for one signed-in user.
pub struct Session {
    engine: Arc<SyncEngine>,
    user: UserId,
    selected_chat: Option<ChatId>,
    /// Last selected thread per chat, so switching back to a chat restores
    /// its thread.
    selected_threads: HashMap<ChatId, String>,
    /// Visible window per (chat, thread) pair.
    windows: HashMap<(ChatId, String), VisibleWindow>,
    /// Monotonic rebuild generation; stale partition results carry an
    /// older value and are discarded.
    generation: Arc<AtomicU64>,
    partition_tx: Arc<watch::Sender<Option<ThreadPartition>>>,
}

impl Session {
    pub fn new(engine: Arc<SyncEngine>, user: UserId) -> Self {
        let (partition_tx, _) = watch::channel(None);
        Self {
            engine,
            user,
            selected_chat: None,
            selected_threads: HashMap::new(),
            windows: HashMap::new(),
            generation: Arc::new(AtomicU64::new(0)),
            partition_tx: Arc::new(partition_tx),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn selected_chat(&self) -> Option<&ChatId> {
        self.selected_chat.as_ref()
    }

    /// Active thread of the selected chat ("general" until chosen).
    pub fn selected_thread(&self) -> &str {
        match &self.selected_chat {
            Some(chat_id) => self
                .selected_threads
                .get(chat_id)
                .map(String::as_str)
                .unwrap_or(GENERAL_THREAD),
            None => GENERAL_THREAD,
        }
    }

    /// Reactive view of the active thread partition.
    pub fn partition_watch(&self) -> watch::Receiver<Option<ThreadPartition>> {
        self.partition_tx.subscribe()
    }

    /// Select (and if necessary open/subscribe) a chat, restoring its last
    /// selected thread, resetting the visible window, and scheduling a
    /// partition rebuild.
    pub async fn select_chat(
        &mut self,
        chat_id: ChatId,
        group_id: impl Into<String>,
        direct_to: Option<UserId>,
    ) -> Result<()> {
        self.engine
            .open_chat(chat_id.clone(), group_id, direct_to)
            .await?;

        self.selected_chat = Some(chat_id.clone());
        let thread = self
            .selected_threads
            .get(&chat_id)
            .cloned()
            .unwrap_or_else(|| GENERAL_THREAD.to_string());
        self.reset_window(&chat_id, &thread);
        self.request_rebuild();
        Ok(())
    }

    /// Switch the selected chat to another thread.  No-op with no chat
    /// selected.
    pub fn select_thread(&mut self, thread: &str) {
        let Some(chat_id) = self.selected_chat.clone() else {
            return;
        };
        self.selected_threads
            .insert(chat_id.clone(), thread.to_string());
        self.reset_window(&chat_id, thread);
        self.request_rebuild();
    }

    /// Schedule a rebuild of the active thread partition.
    ///
    /// This is the single funnel for invalidation: call it on selection
    /// changes (done internally) and whenever the engine's chat list
    /// changes.  Requests are debounced; a request superseded during the
    /// debounce or the compute is discarded.
    pub fn request_rebuild(&self) {
        let Some(chat_id) = self.selected_chat.clone() else {
            self.partition_tx.send_replace(None);
            return;
        };
        let thread = self.selected_thread().to_string();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let counter = Arc::clone(&self.generation);
        let engine = Arc::clone(&self.engine);
        let partition_tx = Arc::clone(&self.partition_tx);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(REBUILD_DEBOUNCE_MS)).await;
            if counter.load(Ordering::SeqCst) != generation {
                return;
            }

            // Snapshot after the debounce so coalesced requests see the
            // freshest chat state.
            let Some(chat) = engine.chat(&chat_id) else {
                return;
            };

            let thread_for_worker = thread.clone();
            let result = tokio::task::spawn_blocking(move || {
                partition::partition(&chat, &thread_for_worker)
            })
            .await;
            let Ok((messages, index)) = result else {
                return;
            };

            if counter.load(Ordering::SeqCst) != generation {
                debug!(chat = %chat_id, thread, generation, "discarding stale partition");
                return;
            }
            partition_tx.send_replace(Some(ThreadPartition {
                chat_id,
                thread,
                messages,
                index,
                generation,
            }));
        });
    }

    /// Expand the visible window of the active thread.  Returns whether
    /// the window grew (`false` when fully expanded, nothing is selected,
    /// or an expansion is already in flight).
    pub fn load_older(&mut self) -> bool {
        let Some(chat_id) = self.selected_chat.clone() else {
            return false;
        };
        let thread = self.selected_thread().to_string();
        let total = self
            .engine
            .chat(&chat_id)
            .map(|c| partition::thread_len(&c, &thread))
            .unwrap_or(0);

        let window = self
            .windows
            .entry((chat_id, thread))
            .or_insert_with(|| VisibleWindow::new(total));
        if !window.begin_load_older(total) {
            return false;
        }
        window.finish_load_older(total);
        true
    }

    /// Whether a "load older" expansion is in flight for the active
    /// thread.
    pub fn is_loading_older(&self) -> bool {
        let Some(chat_id) = &self.selected_chat else {
            return false;
        };
        let key = (chat_id.clone(), self.selected_thread().to_string());
        self.windows
            .get(&key)
            .map(VisibleWindow::is_loading_older)
            .unwrap_or(false)
    }

    /// The trailing visible slice of a published partition, bounded by the
    /// window for that (chat, thread).
    pub fn visible_slice<'a>(&self, partition: &'a ThreadPartition) -> &'a [ChatMessage] {
        let key = (partition.chat_id.clone(), partition.thread.clone());
        match self.windows.get(&key) {
            Some(window) => window.visible_slice(&partition.messages),
            None => VisibleWindow::new(partition.messages.len()).visible_slice(&partition.messages),
        }
    }

    fn reset_window(&mut self, chat_id: &ChatId, thread: &str) {
        let total = self
            .engine
            .chat(chat_id)
            .map(|c| partition::thread_len(&c, thread))
            .unwrap_or(0);
        self.windows
            .entry((chat_id.clone(), thread.to_string()))
            .or_insert_with(|| VisibleWindow::new(total))
            .reset(total);
    }
}
