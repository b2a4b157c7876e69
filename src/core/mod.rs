//! Conversation core shared by the one-shot commands and the interactive loop.

pub mod annotation;
pub mod client;
mod error;
pub mod message;
pub mod mode;
pub mod profile;
pub mod request;
pub mod session;
pub mod storage;
pub mod transcript;

pub use annotation::{DrugTag, PendingAnnotations};
pub use client::{AssistantClient, HttpClient, Reply};
pub use error::{ChatError, Result};
pub use message::{Message, Role};
pub use mode::{Mode, ModeController};
pub use profile::Profile;
pub use request::{Payload, RequestBuilder};
pub use session::{ChatSession, FALLBACK_REPLY, WELCOME_MESSAGE};
pub use storage::{MemoryStore, SqliteStore, Store, StoreError};
