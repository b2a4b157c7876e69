//! Remote assistant service abstraction.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::request::Payload;

pub use http::{DEFAULT_BASE_URL, HttpClient};

/// Successful response body of either endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Assistant reply text.
    pub reply: String,

    /// Thread id, returned by `/assistant` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Sends one payload to the service and returns its reply.
///
/// Exactly one network call per invocation, no retries. Implementations
/// never touch the store: persistence belongs to the session.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Client name, for logs.
    fn name(&self) -> &'static str;

    async fn send(&self, payload: &Payload) -> Result<Reply>;
}
