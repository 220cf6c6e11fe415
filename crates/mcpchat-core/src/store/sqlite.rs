//! SQLite-backed chat store

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::models::{clip_title, Conversation, StoredMessage, StoredRole};
use crate::chat::ToolCallRecord;
use crate::types::ChatMessage;

/// Sets PRAGMAs on every new connection
#[derive(Debug)]
struct SqliteCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for SqliteCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(10))?;
        Ok(())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT 'New Chat' CHECK (length(title) <= 200),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL,
    role TEXT NOT NULL CHECK (length(role) <= 20),
    content TEXT NOT NULL,
    tool_calls TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY(conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at, id);
"#;

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Invalid(format!("timestamp '{}': {}", value, e)))
}

/// Raw columns of a conversation row
type ConversationRow = (i64, String, String, String);

/// Raw columns of a message row
type MessageRow = (i64, i64, String, String, Option<String>, String);

fn conversation_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn to_conversation((id, title, created_at, updated_at): ConversationRow) -> StoreResult<Conversation> {
    Ok(Conversation {
        id,
        title,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

fn to_message((id, conversation_id, role, content, tool_calls, created_at): MessageRow) -> StoreResult<StoredMessage> {
    let role = StoredRole::parse(&role).ok_or_else(|| StoreError::Invalid(format!("message role '{}'", role)))?;
    let tool_calls = match tool_calls {
        Some(json) => Some(serde_json::from_str::<Vec<ToolCallRecord>>(&json)?),
        None => None,
    };
    Ok(StoredMessage {
        id,
        conversation_id,
        role,
        content,
        tool_calls,
        created_at: parse_time(&created_at)?,
    })
}

/// Model turn for a stored row. Rows with blank content are skipped since the
/// provider rejects empty turns.
fn to_chat_message(message: &StoredMessage) -> Option<ChatMessage> {
    if message.content.trim().is_empty() {
        return None;
    }
    match message.role {
        StoredRole::User => Some(ChatMessage::user(message.content.clone())),
        StoredRole::Assistant => Some(ChatMessage::assistant(message.content.clone())),
        StoredRole::ToolUse | StoredRole::ToolResult => None,
    }
}

/// Conversation and message storage over a pooled SQLite database
#[derive(Clone)]
pub struct ChatStore {
    pool: Pool<SqliteConnectionManager>,
}

impl ChatStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let pool = Pool::builder()
            .max_size(8)
            .connection_customizer(Box::new(SqliteCustomizer))
            .build(SqliteConnectionManager::file(path))?;

        let store = Self { pool };
        store.init(true)?;
        info!(path = %path.display(), "Opened chat database");
        Ok(store)
    }

    /// Private in-memory database, for tests and throwaway runs
    pub fn open_in_memory() -> StoreResult<Self> {
        // Every in-memory connection is its own database, so the pool holds one
        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(SqliteCustomizer))
            .build(SqliteConnectionManager::memory())?;

        let store = Self { pool };
        store.init(false)?;
        Ok(store)
    }

    fn init(&self, wal: bool) -> StoreResult<()> {
        let conn = self.pool.get()?;
        if wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run blocking store work on the blocking thread pool
    pub async fn run<T, F>(&self, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ChatStore) -> StoreResult<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub fn create_conversation(&self, title: &str) -> StoreResult<Conversation> {
        let conn = self.pool.get()?;
        let title = clip_title(title);
        let stamp = now();
        conn.execute(
            "INSERT INTO conversations (title, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![title, stamp],
        )?;
        let id = conn.last_insert_rowid();
        debug!(conversation_id = id, "Created conversation");

        Ok(Conversation {
            id,
            title,
            created_at: parse_time(&stamp)?,
            updated_at: parse_time(&stamp)?,
        })
    }

    pub fn get_conversation(&self, id: i64) -> StoreResult<Option<Conversation>> {
        let conn = self.pool.get()?;
        let row = conn
            .prepare_cached("SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?1")?
            .query_row(params![id], conversation_row)
            .optional()?;
        row.map(to_conversation).transpose()
    }

    /// Most recently updated first
    pub fn list_conversations(&self, limit: usize) -> StoreResult<Vec<Conversation>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, created_at, updated_at FROM conversations
             ORDER BY updated_at DESC, id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], conversation_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_conversation).collect()
    }

    pub fn rename_conversation(&self, id: i64, title: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![clip_title(title), now(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::conversation_not_found(id));
        }
        Ok(())
    }

    /// Delete a conversation and, through the cascade, its messages
    pub fn delete_conversation(&self, id: i64) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::conversation_not_found(id));
        }
        debug!(conversation_id = id, "Deleted conversation");
        Ok(())
    }

    /// Append a message and touch the conversation's `updated_at`
    pub fn add_message(
        &self,
        conversation_id: i64,
        role: StoredRole,
        content: &str,
        tool_calls: Option<&[ToolCallRecord]>,
    ) -> StoreResult<StoredMessage> {
        let tool_calls = tool_calls.filter(|calls| !calls.is_empty());
        let tool_calls_json = tool_calls.map(serde_json::to_string).transpose()?;

        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let stamp = now();

        let touched = tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![stamp, conversation_id],
        )?;
        if touched == 0 {
            return Err(StoreError::conversation_not_found(conversation_id));
        }

        tx.prepare_cached(
            "INSERT INTO messages (conversation_id, role, content, tool_calls, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![conversation_id, role.as_str(), content, tool_calls_json, stamp])?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(conversation_id, message_id = id, %role, "Stored message");
        Ok(StoredMessage {
            id,
            conversation_id,
            role,
            content: content.to_string(),
            tool_calls: tool_calls.map(<[ToolCallRecord]>::to_vec),
            created_at: parse_time(&stamp)?,
        })
    }

    /// Messages of a conversation, oldest first
    pub fn list_messages(&self, conversation_id: i64) -> StoreResult<Vec<StoredMessage>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, conversation_id, role, content, tool_calls, created_at FROM messages
             WHERE conversation_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![conversation_id], message_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_message).collect()
    }

    pub fn count_messages(&self, conversation_id: i64) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// User and assistant turns as model messages, oldest first
    pub fn history_for_model(&self, conversation_id: i64) -> StoreResult<Vec<ChatMessage>> {
        Ok(self
            .list_messages(conversation_id)?
            .iter()
            .filter_map(to_chat_message)
            .collect())
    }

    /// Like [`history_for_model`](Self::history_for_model), limited to
    /// messages stored before `message_id`
    pub fn history_before(&self, conversation_id: i64, message_id: i64) -> StoreResult<Vec<ChatMessage>> {
        Ok(self
            .list_messages(conversation_id)?
            .iter()
            .filter(|m| m.id < message_id)
            .filter_map(to_chat_message)
            .collect())
    }
}

impl std::fmt::Debug for ChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("ChatStore")
            .field("connections", &state.connections)
            .field("idle", &state.idle_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::types::MessageRole;

    fn store() -> ChatStore {
        ChatStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_conversation_crud() {
        let store = store();
        let conv = store.create_conversation("New Chat").unwrap();
        assert_eq!(conv.title, "New Chat");

        let loaded = store.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(loaded, conv);
        assert!(store.get_conversation(conv.id + 100).unwrap().is_none());

        store.rename_conversation(conv.id, &"x".repeat(250)).unwrap();
        let renamed = store.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(renamed.title.len(), 200);

        store.delete_conversation(conv.id).unwrap();
        assert!(store.get_conversation(conv.id).unwrap().is_none());
        assert!(matches!(store.delete_conversation(conv.id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.rename_conversation(conv.id, "t"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_orders_by_most_recent_activity() {
        let store = store();
        let first = store.create_conversation("first").unwrap();
        let second = store.create_conversation("second").unwrap();
        let third = store.create_conversation("third").unwrap();

        store.add_message(first.id, StoredRole::User, "bump", None).unwrap();

        let ids: Vec<i64> = store.list_conversations(10).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, third.id, second.id]);
        assert_eq!(store.list_conversations(2).unwrap().len(), 2);
    }

    #[test]
    fn test_messages_and_tool_calls() {
        let store = store();
        let conv = store.create_conversation("New Chat").unwrap();

        let user = store.add_message(conv.id, StoredRole::User, "weather in Paris?", None).unwrap();
        assert!(user.tool_calls.is_none());

        let calls = vec![ToolCallRecord {
            tool: "get_weather".to_string(),
            input: json!({"latitude": 48.85, "longitude": 2.35}),
            result: json!({"temperature": "18°C"}),
        }];
        store
            .add_message(conv.id, StoredRole::Assistant, "It is 18°C.", Some(calls.as_slice()))
            .unwrap();
        store.add_message(conv.id, StoredRole::Assistant, "again", Some(&[][..])).unwrap();

        let messages = store.list_messages(conv.id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, StoredRole::User);
        assert_eq!(messages[1].tool_calls.as_deref(), Some(&calls[..]));
        assert!(messages[2].tool_calls.is_none());
        assert_eq!(store.count_messages(conv.id).unwrap(), 3);
    }

    #[test]
    fn test_add_message_to_missing_conversation() {
        let store = store();
        let result = store.add_message(42, StoredRole::User, "hello", None);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_history_skips_tool_rows() {
        let store = store();
        let conv = store.create_conversation("New Chat").unwrap();
        store.add_message(conv.id, StoredRole::User, "q1", None).unwrap();
        store.add_message(conv.id, StoredRole::ToolUse, "{}", None).unwrap();
        store.add_message(conv.id, StoredRole::ToolResult, "{}", None).unwrap();
        store.add_message(conv.id, StoredRole::Assistant, "a1", None).unwrap();
        let latest = store.add_message(conv.id, StoredRole::User, "q2", None).unwrap();

        let history = store.history_for_model(conv.id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], ChatMessage::user("q1"));
        assert_eq!(history[1].role, MessageRole::Assistant);

        let before = store.history_before(conv.id, latest.id).unwrap();
        assert_eq!(before, vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")]);
    }

    #[test]
    fn test_history_skips_blank_rows() {
        let store = store();
        let conv = store.create_conversation("New Chat").unwrap();
        store.add_message(conv.id, StoredRole::User, "loop", None).unwrap();
        store.add_message(conv.id, StoredRole::Assistant, "", None).unwrap();
        store.add_message(conv.id, StoredRole::Assistant, "  \n", None).unwrap();
        let latest = store.add_message(conv.id, StoredRole::User, "again", None).unwrap();

        assert_eq!(store.history_before(conv.id, latest.id).unwrap(), vec![ChatMessage::user("loop")]);
        assert_eq!(store.list_messages(conv.id).unwrap().len(), 4);
    }

    #[test]
    fn test_delete_cascades_to_messages() {
        let store = store();
        let conv = store.create_conversation("New Chat").unwrap();
        store.add_message(conv.id, StoredRole::User, "hi", None).unwrap();
        store.delete_conversation(conv.id).unwrap();
        assert_eq!(store.count_messages(conv.id).unwrap(), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");
        let id = {
            let store = ChatStore::open(&path).unwrap();
            let conv = store.create_conversation("kept").unwrap();
            store.add_message(conv.id, StoredRole::User, "hello", None).unwrap();
            conv.id
        };

        let store = ChatStore::open(&path).unwrap();
        assert_eq!(store.get_conversation(id).unwrap().unwrap().title, "kept");
        assert_eq!(store.count_messages(id).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_on_blocking_pool() {
        let store = store();
        let conv = store.run(|s| s.create_conversation("async")).await.unwrap();
        let count = store.run(move |s| s.count_messages(conv.id)).await.unwrap();
        assert_eq!(count, 0);
    }
}
