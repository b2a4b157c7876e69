//! Local persistence for the conversation log and its metadata.
//!
//! Two independent collections live in one store: an insertion-ordered
//! message log and a string-keyed metadata map. Only [`Store::reset`] clears
//! them, and it clears both together.

mod memory;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use super::message::Message;

pub use memory::MemoryStore;
pub use sqlite::{SCHEMA_VERSION, SqliteStore};

/// Metadata key holding the server-assigned assistant thread.
pub const THREAD_ID_KEY: &str = "assistant_thread_id";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is not open.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Storage result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Everything a successful turn writes.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The user's turn, persisted first.
    pub user: Message,
    /// The reply, persisted second.
    pub reply: Message,
    /// New thread id returned by the service, if any.
    pub thread_id: Option<String>,
}

/// Persistent conversation store.
///
/// Implementations are opened before use. Once closed, reads behave as if
/// the store were empty and writes fail with [`StoreError::Unavailable`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Whether the store accepts writes.
    fn is_open(&self) -> bool;

    /// Append a message to the log.
    async fn append(&self, message: Message) -> Result<()>;

    /// Every message in insertion order.
    async fn all_messages(&self) -> Result<Vec<Message>>;

    /// Insert or overwrite a metadata value.
    async fn set_metadata(&self, key: &str, value: &str) -> Result<()>;

    async fn get_metadata(&self, key: &str) -> Result<Option<String>>;

    /// Persist a whole exchange atomically: no observer sees part of it.
    async fn record_exchange(&self, exchange: Exchange) -> Result<()>;

    /// Empty the log and the metadata map in one step.
    async fn reset(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shared behaviour checks, run against every backend.
    pub(super) async fn exercise_store(store: &dyn Store) {
        assert!(store.is_open());
        assert!(store.all_messages().await.unwrap().is_empty());
        assert_eq!(store.get_metadata(THREAD_ID_KEY).await.unwrap(), None);

        let contents = ["first", "second", "third", "fourth"];
        for (i, content) in contents.iter().enumerate() {
            let message = if i % 2 == 0 {
                Message::user(*content)
            } else {
                Message::assistant(*content)
            };
            store.append(message).await.unwrap();
        }
        let stored: Vec<String> = store
            .all_messages()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(stored, contents);

        store.set_metadata(THREAD_ID_KEY, "T1").await.unwrap();
        store.set_metadata(THREAD_ID_KEY, "T2").await.unwrap();
        store.set_metadata("other", "x").await.unwrap();
        assert_eq!(
            store.get_metadata(THREAD_ID_KEY).await.unwrap().as_deref(),
            Some("T2")
        );

        store
            .record_exchange(Exchange {
                user: Message::user("q"),
                reply: Message::assistant("a"),
                thread_id: Some("T3".to_string()),
            })
            .await
            .unwrap();
        let all = store.all_messages().await.unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[4].content, "q");
        assert_eq!(all[5].content, "a");
        assert_eq!(
            store.get_metadata(THREAD_ID_KEY).await.unwrap().as_deref(),
            Some("T3")
        );

        store.reset().await.unwrap();
        assert!(store.all_messages().await.unwrap().is_empty());
        assert_eq!(store.get_metadata(THREAD_ID_KEY).await.unwrap(), None);
        assert_eq!(store.get_metadata("other").await.unwrap(), None);
    }
}
