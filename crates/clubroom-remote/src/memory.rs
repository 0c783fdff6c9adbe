//! In-process reference backend for the remote-store contract.
//!
//! Holds every chat record in memory and serializes all writes through a
//! single command loop, which makes it the serialization point for
//! concurrent full-record overwrites exactly like the production backend.
//! Used by the sync-engine and pipeline tests, and usable as an offline
//! development backend.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use clubroom_shared::{ChatId, UserId};

use crate::protocol::{RemoteCommand, RemoteEvent, RemoteHandle};

/// One chat record: messages keyed by identifier plus whole-value metadata.
#[derive(Debug, Default)]
struct ChatRecord {
    group_id: String,
    direct_to: Option<UserId>,
    messages: BTreeMap<String, Value>,
    typing: Vec<UserId>,
    pinned: Vec<String>,
}

/// An open subscription: events past `after` go to `tx`.
struct Subscriber {
    after: f64,
    tx: mpsc::Sender<RemoteEvent>,
}

/// Spawn the in-memory backend in a background tokio task and return the
/// handle the sync core talks to.
pub fn spawn_memory_remote() -> RemoteHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<RemoteCommand>(256);

    tokio::spawn(async move {
        let mut chats: HashMap<ChatId, ChatRecord> = HashMap::new();
        let mut subs: HashMap<ChatId, Vec<Subscriber>> = HashMap::new();

        info!("memory remote started");

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                RemoteCommand::CreateChat {
                    chat_id,
                    group_id,
                    direct_to,
                } => {
                    let chat = chats.entry(chat_id).or_default();
                    chat.group_id = group_id;
                    chat.direct_to = direct_to;
                }

                RemoteCommand::RemoveChat { chat_id } => {
                    chats.remove(&chat_id);
                    if let Some(chat_subs) = subs.get_mut(&chat_id) {
                        deliver(
                            chat_subs,
                            &RemoteEvent::ChatRemoved {
                                chat_id: chat_id.clone(),
                            },
                            None,
                        )
                        .await;
                    }
                    subs.remove(&chat_id);
                }

                RemoteCommand::PushMessage { chat_id, record } => {
                    push_message(&mut chats, &mut subs, chat_id, record).await;
                }

                RemoteCommand::UpdateMessage {
                    chat_id,
                    message_id,
                    record,
                } => {
                    let mut record = record;
                    let Some(obj) = record.as_object_mut() else {
                        warn!(chat = %chat_id, "dropping non-object message update");
                        continue;
                    };
                    obj.insert("messageID".into(), Value::String(message_id.clone()));

                    let cursor = record_cursor(&record);
                    chats
                        .entry(chat_id.clone())
                        .or_default()
                        .messages
                        .insert(message_id, record.clone());

                    if let Some(chat_subs) = subs.get_mut(&chat_id) {
                        deliver(
                            chat_subs,
                            &RemoteEvent::MessageChanged {
                                chat_id,
                                payload: record,
                            },
                            Some(cursor),
                        )
                        .await;
                    }
                }

                RemoteCommand::RemoveMessage {
                    chat_id,
                    message_id,
                } => {
                    let removed = chats
                        .get_mut(&chat_id)
                        .map(|c| c.messages.remove(&message_id).is_some())
                        .unwrap_or(false);
                    if removed {
                        if let Some(chat_subs) = subs.get_mut(&chat_id) {
                            deliver(
                                chat_subs,
                                &RemoteEvent::MessageRemoved {
                                    chat_id,
                                    message_id,
                                },
                                None,
                            )
                            .await;
                        }
                    }
                }

                RemoteCommand::SetTyping { chat_id, users } => {
                    chats.entry(chat_id.clone()).or_default().typing = users.clone();
                    if let Some(chat_subs) = subs.get_mut(&chat_id) {
                        deliver(
                            chat_subs,
                            &RemoteEvent::TypingChanged { chat_id, users },
                            None,
                        )
                        .await;
                    }
                }

                RemoteCommand::SetPinned { chat_id, pinned } => {
                    chats.entry(chat_id.clone()).or_default().pinned = pinned.clone();
                    if let Some(chat_subs) = subs.get_mut(&chat_id) {
                        deliver(
                            chat_subs,
                            &RemoteEvent::PinnedChanged { chat_id, pinned },
                            None,
                        )
                        .await;
                    }
                }

                RemoteCommand::Subscribe {
                    chat_id,
                    after,
                    events,
                } => {
                    replay(&chats, &chat_id, after, &events).await;
                    subs.entry(chat_id)
                        .or_default()
                        .push(Subscriber { after, tx: events });
                }

                RemoteCommand::Shutdown => {
                    info!("memory remote shutdown requested");
                    break;
                }
            }
        }

        info!("memory remote loop terminated");
    });

    RemoteHandle::new(cmd_tx)
}

/// Handle a `PushMessage`: assign an identifier when the record carries an
/// empty one, then store and fan out as added or changed.
async fn push_message(
    chats: &mut HashMap<ChatId, ChatRecord>,
    subs: &mut HashMap<ChatId, Vec<Subscriber>>,
    chat_id: ChatId,
    mut record: Value,
) {
    let Some(obj) = record.as_object_mut() else {
        warn!(chat = %chat_id, "dropping non-object message push");
        return;
    };

    let mut message_id = obj
        .get("messageID")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if message_id.is_empty() {
        message_id = Uuid::new_v4().to_string();
        obj.insert("messageID".into(), Value::String(message_id.clone()));
        debug!(chat = %chat_id, msg_id = %message_id, "assigned message identifier on write");
    }

    let cursor = record_cursor(&record);
    let chat = chats.entry(chat_id.clone()).or_default();
    let existed = chat.messages.insert(message_id, record.clone()).is_some();

    if let Some(chat_subs) = subs.get_mut(&chat_id) {
        let event = if existed {
            RemoteEvent::MessageChanged {
                chat_id,
                payload: record,
            }
        } else {
            RemoteEvent::MessageAdded {
                chat_id,
                payload: record,
            }
        };
        deliver(chat_subs, &event, Some(cursor)).await;
    }
}

/// Replay existing state to a fresh subscription: message records past the
/// cursor as added events (ascending timestamp order), then the current
/// metadata values.
async fn replay(
    chats: &HashMap<ChatId, ChatRecord>,
    chat_id: &ChatId,
    after: f64,
    events: &mpsc::Sender<RemoteEvent>,
) {
    let Some(chat) = chats.get(chat_id) else {
        return;
    };

    let mut backlog: Vec<&Value> = chat
        .messages
        .values()
        .filter(|record| record_cursor(record) > after)
        .collect();
    backlog.sort_by(|a, b| record_cursor(a).total_cmp(&record_cursor(b)));

    for record in backlog {
        let _ = events
            .send(RemoteEvent::MessageAdded {
                chat_id: chat_id.clone(),
                payload: (*record).clone(),
            })
            .await;
    }

    let _ = events
        .send(RemoteEvent::TypingChanged {
            chat_id: chat_id.clone(),
            users: chat.typing.clone(),
        })
        .await;
    let _ = events
        .send(RemoteEvent::PinnedChanged {
            chat_id: chat_id.clone(),
            pinned: chat.pinned.clone(),
        })
        .await;
}

/// Fan an event out to a chat's subscribers, dropping closed channels.
/// When `cursor` is set, subscribers whose cursor is at or past it are
/// skipped (the child-event filter of the subscription contract).
async fn deliver(subs: &mut Vec<Subscriber>, event: &RemoteEvent, cursor: Option<f64>) {
    let mut live = Vec::with_capacity(subs.len());
    for sub in subs.drain(..) {
        if let Some(c) = cursor {
            if c <= sub.after {
                live.push(sub);
                continue;
            }
        }
        if sub.tx.send(event.clone()).await.is_ok() {
            live.push(sub);
        }
    }
    *subs = live;
}

/// Ordering timestamp of a raw record: `lastUpdated`, falling back to
/// `date`.
fn record_cursor(record: &Value) -> f64 {
    record
        .get("lastUpdated")
        .and_then(Value::as_f64)
        .or_else(|| record.get("date").and_then(Value::as_f64))
        .unwrap_or(0.0)
}
