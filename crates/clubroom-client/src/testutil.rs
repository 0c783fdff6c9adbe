//! Shared helpers for the engine, pipeline, and session tests.

use std::sync::Arc;
use std::time::Duration;

use clubroom_remote::{spawn_memory_remote, RemoteHandle};
use clubroom_shared::{Chat, ChatId};
use clubroom_store::Database;

use crate::engine::SyncEngine;

/// Engine over a fresh temp-dir store and an in-memory remote backend.
/// Must be called from within a tokio runtime.
pub(crate) fn open_test_engine() -> (Arc<SyncEngine>, RemoteHandle, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("cache.db")).unwrap();
    let remote = spawn_memory_remote();
    let engine = SyncEngine::new(remote.clone(), db);
    (engine, remote, dir)
}

/// Wait (bounded) until the tracked chat satisfies `pred`, returning its
/// snapshot.
pub(crate) async fn wait_for_chat(
    engine: &Arc<SyncEngine>,
    chat_id: &ChatId,
    pred: impl Fn(&Chat) -> bool,
) -> Chat {
    let mut rx = engine.chats();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let chats = rx.borrow();
                if let Some(chat) = chats.iter().find(|c| &c.chat_id == chat_id) {
                    if pred(chat) {
                        return chat.clone();
                    }
                }
            }
            rx.changed().await.expect("engine dropped");
        }
    })
    .await
    .expect("chat condition not reached in time")
}
