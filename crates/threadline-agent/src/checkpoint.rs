//! Per-thread conversation memory.
//!
//! A [`Checkpointer`] stores the ordered history of each thread. Two
//! strategies are provided: [`MemoryCheckpointer`] for development and
//! [`SqliteCheckpointer`] for history that survives restarts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use threadline_config::CheckpointStrategy;
use threadline_core::{AgentError, Message, MessageRole, ThreadId};
use tokio::sync::RwLock;
use tracing::{error, info};

/// A message as stored in a thread, with a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

impl ThreadMessage {
    /// Wraps a message, assigning it a fresh UUID.
    pub fn new(message: Message) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: message.role,
            content: message.content,
        }
    }

    pub fn to_message(&self) -> Message {
        Message { role: self.role, content: self.content.clone() }
    }
}

/// Storage strategy for thread history.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Returns the thread's messages, oldest first. Unknown threads are empty.
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, AgentError>;

    /// Appends messages to the end of the thread.
    async fn append(&self, thread_id: &ThreadId, messages: &[ThreadMessage]) -> Result<(), AgentError>;

    /// Short label for logging.
    fn name(&self) -> &'static str;
}

/// Builds the checkpointer for a resolved strategy.
pub fn build_checkpointer(strategy: &CheckpointStrategy) -> Result<Arc<dyn Checkpointer>, AgentError> {
    match strategy {
        CheckpointStrategy::Memory => {
            let checkpointer = MemoryCheckpointer::new();
            info!("Using {} checkpoints", checkpointer.name());
            Ok(Arc::new(checkpointer))
        }
        CheckpointStrategy::Sqlite { path } => {
            let checkpointer = SqliteCheckpointer::open(path).map_err(|e| {
                AgentError::Initialization(format!("sqlite checkpoints at {}: {}", path.display(), e))
            })?;
            info!("Using {} checkpoints at {}", checkpointer.name(), path.display());
            Ok(Arc::new(checkpointer))
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Keeps history in process memory; lost on exit.
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<ThreadId, Vec<ThreadMessage>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, AgentError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    async fn append(&self, thread_id: &ThreadId, messages: &[ThreadMessage]) -> Result<(), AgentError> {
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.clone())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// SQLite
// ============================================================================

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS thread_messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        thread_id TEXT NOT NULL,
        message_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_thread_messages_thread ON thread_messages (thread_id, seq);";

fn storage_err(e: impl ToString) -> AgentError {
    AgentError::Storage(e.to_string())
}

fn role_to_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn role_from_str(role: &str) -> Option<MessageRole> {
    match role {
        "user" => Some(MessageRole::User),
        "assistant" => Some(MessageRole::Assistant),
        _ => None,
    }
}

/// Keeps history in a SQLite database file.
pub struct SqliteCheckpointer {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointer {
    /// Opens (or creates) the database, creating parent directories and tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, AgentError> {
        Self::with_connection(Connection::open_in_memory().map_err(storage_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AgentError> {
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Acquires the connection lock, converting poison errors to AgentError.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AgentError> {
        self.conn.lock().map_err(|e| {
            error!("Checkpoint DB lock poisoned: {}", e);
            AgentError::Storage("checkpoint database lock error".into())
        })
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, AgentError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT message_id, role, content FROM thread_messages
                 WHERE thread_id = ?1 ORDER BY seq",
            )
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(params![thread_id.as_str()], |row| {
                let id: String = row.get(0)?;
                let role: String = row.get(1)?;
                let content: String = row.get(2)?;
                Ok((id, role, content))
            })
            .map_err(storage_err)?;

        let messages = rows
            .map(|row| {
                let (id, role, content) = row.map_err(storage_err)?;
                let role = role_from_str(&role)
                    .ok_or_else(|| AgentError::Storage(format!("unknown role '{}' in thread {}", role, thread_id)))?;
                Ok(ThreadMessage { id, role, content })
            })
            .collect::<Result<Vec<_>, AgentError>>()?;
        Ok(messages)
    }

    async fn append(&self, thread_id: &ThreadId, messages: &[ThreadMessage]) -> Result<(), AgentError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage_err)?;
        for msg in messages {
            tx.execute(
                "INSERT INTO thread_messages (thread_id, message_id, role, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![thread_id.as_str(), msg.id, role_to_str(msg.role), msg.content],
            )
            .map_err(storage_err)?;
        }
        tx.commit().map_err(storage_err)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(texts: &[(MessageRole, &str)]) -> Vec<ThreadMessage> {
        texts
            .iter()
            .map(|(role, text)| ThreadMessage::new(Message { role: *role, content: text.to_string() }))
            .collect()
    }

    async fn appends_in_order_and_isolates_threads(store: &dyn Checkpointer) {
        let a = ThreadId::from("a");
        let b = ThreadId::from("b");

        assert!(store.load(&a).await.unwrap().is_empty());

        let first = msgs(&[(MessageRole::User, "hi"), (MessageRole::Assistant, "hello")]);
        let second = msgs(&[(MessageRole::User, "again")]);
        store.append(&a, &first).await.unwrap();
        store.append(&b, &msgs(&[(MessageRole::User, "other")])).await.unwrap();
        store.append(&a, &second).await.unwrap();

        let loaded = store.load(&a).await.unwrap();
        let expected: Vec<ThreadMessage> = first.into_iter().chain(second).collect();
        assert_eq!(loaded, expected);

        let other = store.load(&b).await.unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].content, "other");
    }

    #[tokio::test]
    async fn memory_checkpointer_keeps_threads_apart() {
        let store = MemoryCheckpointer::new();
        appends_in_order_and_isolates_threads(&store).await;
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn sqlite_checkpointer_keeps_threads_apart() {
        let store = SqliteCheckpointer::open_in_memory().unwrap();
        appends_in_order_and_isolates_threads(&store).await;
        assert_eq!(store.name(), "sqlite");
    }

    #[tokio::test]
    async fn sqlite_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("checkpoints.db");
        let thread = ThreadId::from("t1");
        let saved = msgs(&[(MessageRole::User, "remember me")]);

        {
            let store = SqliteCheckpointer::open(&path).unwrap();
            store.append(&thread, &saved).await.unwrap();
        }

        let store = SqliteCheckpointer::open(&path).unwrap();
        assert_eq!(store.load(&thread).await.unwrap(), saved);
    }

    #[test]
    fn build_checkpointer_reports_unopenable_sqlite_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let strategy = CheckpointStrategy::Sqlite { path: dir.path().to_path_buf() };
        let err = build_checkpointer(&strategy).err().unwrap();
        assert!(matches!(err, AgentError::Initialization(_)));
    }

    #[test]
    fn build_checkpointer_follows_strategy() {
        let memory = build_checkpointer(&CheckpointStrategy::Memory).unwrap();
        assert_eq!(memory.name(), "memory");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.db");
        let sqlite = build_checkpointer(&CheckpointStrategy::Sqlite { path: path.clone() }).unwrap();
        assert_eq!(sqlite.name(), "sqlite");
        assert!(path.exists());
    }

    #[test]
    fn thread_messages_get_unique_ids() {
        let a = ThreadMessage::new(Message::user("x"));
        let b = ThreadMessage::new(Message::user("x"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.to_message(), Message::user("x"));
    }
}
