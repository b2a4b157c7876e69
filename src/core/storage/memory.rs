//! In-memory store for tests and throwaway sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Exchange, Result, Store, StoreError};
use crate::core::message::Message;

#[derive(Debug, Default)]
struct Collections {
    messages: Vec<Message>,
    metadata: HashMap<String, String>,
}

/// Store that lives only as long as the process.
///
/// One lock covers both collections, so every operation is atomic.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Option<Collections>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an open, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Some(Collections::default())),
        }
    }

    /// Drop all contents and refuse further writes.
    pub fn close(&self) {
        *self.inner.lock() = None;
    }

    fn write<T>(&self, f: impl FnOnce(&mut Collections) -> T) -> Result<T> {
        let mut guard = self.inner.lock();
        let collections = guard
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("memory store is closed".to_string()))?;
        Ok(f(collections))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_open(&self) -> bool {
        self.inner.lock().is_some()
    }

    async fn append(&self, message: Message) -> Result<()> {
        self.write(|c| c.messages.push(message))
    }

    async fn all_messages(&self) -> Result<Vec<Message>> {
        Ok(self
            .inner
            .lock()
            .as_ref()
            .map(|c| c.messages.clone())
            .unwrap_or_default())
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.write(|c| {
            c.metadata.insert(key.to_string(), value.to_string());
        })
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .as_ref()
            .and_then(|c| c.metadata.get(key).cloned()))
    }

    async fn record_exchange(&self, exchange: Exchange) -> Result<()> {
        self.write(|c| {
            if let Some(thread_id) = exchange.thread_id {
                c.metadata.insert(super::THREAD_ID_KEY.to_string(), thread_id);
            }
            c.messages.push(exchange.user);
            c.messages.push(exchange.reply);
        })
    }

    async fn reset(&self) -> Result<()> {
        self.write(|c| {
            c.messages.clear();
            c.metadata.clear();
        })
    }
}
