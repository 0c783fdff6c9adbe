//! Load/save/evict operations for per-chat snapshot records.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use clubroom_shared::{Chat, ChatId};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Load the last persisted snapshot for a chat, or `None` if the chat
    /// was never cached.
    ///
    /// A corrupt or undecodable payload is treated identically to "not
    /// cached": the row is logged and dropped, never surfaced as an error,
    /// so the sync engine can proceed from empty state.
    pub fn load_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>> {
        let payload: Option<String> = self
            .conn()
            .query_row(
                "SELECT payload FROM chat_snapshots WHERE chat_id = ?1",
                params![chat_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_str::<Chat>(&payload) {
            Ok(chat) => Ok(Some(chat)),
            Err(e) => {
                tracing::warn!(chat = %chat_id, error = %e, "corrupt chat snapshot, treating as cache miss");
                Ok(None)
            }
        }
    }

    /// Overwrite the persisted snapshot for a chat.
    ///
    /// `INSERT OR REPLACE` on the primary key is a single-statement atomic
    /// replace; a concurrent reader sees either the old or the new row,
    /// never a partial one.
    pub fn save_chat(&self, chat: &Chat) -> Result<()> {
        let payload = serde_json::to_string(chat)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO chat_snapshots (chat_id, payload, saved_at)
             VALUES (?1, ?2, ?3)",
            params![
                chat.chat_id.as_str(),
                payload,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete the persisted snapshot for a chat.  No-op if the chat was
    /// never cached.
    pub fn evict_chat(&self, chat_id: &ChatId) -> Result<()> {
        self.conn().execute(
            "DELETE FROM chat_snapshots WHERE chat_id = ?1",
            params![chat_id.as_str()],
        )?;
        Ok(())
    }

    /// List the identifiers of all cached chats, ordered by most recent
    /// save first.
    pub fn cached_chat_ids(&self) -> Result<Vec<ChatId>> {
        let mut stmt = self.conn().prepare(
            "SELECT chat_id FROM chat_snapshots ORDER BY saved_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            Ok(ChatId(id))
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
