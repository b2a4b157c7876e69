//! SQLite-backed store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use super::{Exchange, Result, Store, StoreError, THREAD_ID_KEY};
use crate::core::message::{Message, Role};

/// Schema version written to `PRAGMA user_version` once migrations have run.
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS chats (
         id        INTEGER PRIMARY KEY AUTOINCREMENT,
         role      TEXT NOT NULL,
         content   TEXT NOT NULL,
         timestamp TEXT NOT NULL
     );
     CREATE TABLE IF NOT EXISTS metadata (
         key   TEXT PRIMARY KEY,
         value TEXT NOT NULL
     );",
)];

/// Store backed by an embedded SQLite database.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("open", &self.is_open())
            .finish()
    }
}

impl SqliteStore {
    /// Open the database at `path`, creating it and running migrations as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot open {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "opened conversation store");
        Self::init(conn)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        run_migrations(&mut conn)
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Close the connection. Later writes fail with [`StoreError::Unavailable`].
    pub fn close(&self) {
        if self.conn.lock().take().is_some() {
            tracing::debug!("closed conversation store");
        }
    }

    /// Schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns error if the store is closed or the pragma cannot be read.
    pub fn schema_version(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(user_version(conn)?))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("sqlite store is closed".to_string()))?;
        f(conn)
    }

    /// Like `with_conn`, but a closed store yields `T::default()`.
    fn read<T: Default>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Ok(T::default()),
        }
    }
}

fn user_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Apply every migration newer than the recorded version, each in its own transaction.
fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let current = user_version(conn)?;

    for &(version, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }
        tracing::info!(version, "running store migration");
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version}"))?;
        tx.commit()?;
    }

    Ok(())
}

fn insert_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO chats (role, content, timestamp) VALUES (?1, ?2, ?3)",
        params![message.role.as_str(), message.content, message.timestamp],
    )?;
    Ok(())
}

fn upsert_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    async fn append(&self, message: Message) -> Result<()> {
        self.with_conn(|conn| insert_message(conn, &message))
    }

    async fn all_messages(&self) -> Result<Vec<Message>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT role, content, timestamp FROM chats ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                ))
            })?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content, timestamp) = row?;
                let role: Role = role.parse().map_err(StoreError::Corrupt)?;
                messages.push(Message {
                    role,
                    content,
                    timestamp,
                });
            }
            Ok(messages)
        })
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| upsert_metadata(conn, key, value))
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM metadata WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    async fn record_exchange(&self, exchange: Exchange) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(thread_id) = &exchange.thread_id {
                upsert_metadata(&tx, THREAD_ID_KEY, thread_id)?;
            }
            insert_message(&tx, &exchange.user)?;
            insert_message(&tx, &exchange.reply)?;
            tx.commit()?;
            Ok(())
        })
    }

    async fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM chats", [])?;
            tx.execute("DELETE FROM metadata", [])?;
            tx.commit()?;
            tracing::info!("cleared conversation history");
            Ok(())
        })
    }
}
