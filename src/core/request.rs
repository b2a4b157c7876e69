//! Outbound payload assembly.
//!
//! Assistant mode sends one composed message plus the server thread id, so the
//! payload stays the same size as the conversation grows. Companion mode keeps
//! no server state and re-sends the whole log on every turn.

use serde::{Deserialize, Serialize};

use super::annotation::DrugTag;
use super::error::{ChatError, Result};
use super::message::{Message, Role};
use super::mode::Mode;
use super::profile::Profile;
use super::storage::{Store, THREAD_ID_KEY};

/// Body of `POST /assistant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// One entry of a `POST /chat` message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
}

/// A request ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Assistant(AssistantRequest),
    Companion(ChatRequest),
}

impl Payload {
    /// Mode this payload was built for.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Assistant(_) => Mode::Assistant,
            Self::Companion(_) => Mode::Companion,
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.mode().endpoint()
    }

    /// Thread id carried by an assistant-mode payload.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::Assistant(req) => req.thread_id.as_deref(),
            Self::Companion(_) => None,
        }
    }
}

/// Builds one payload per turn from mode, store contents and user input.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    profile: Profile,
    system_prompt: String,
}

impl RequestBuilder {
    /// `system_prompt` opens every companion-mode message list.
    #[must_use]
    pub fn new(profile: Profile, system_prompt: impl Into<String>) -> Self {
        Self {
            profile,
            system_prompt: system_prompt.into(),
        }
    }

    /// Read what the mode needs from the store and build the payload.
    ///
    /// Validation happens before any store access.
    pub async fn build(
        &self,
        mode: Mode,
        text: &str,
        tags: &[DrugTag],
        store: &dyn Store,
    ) -> Result<Payload> {
        validate(text, tags)?;

        match mode {
            Mode::Assistant => {
                let thread_id = store.get_metadata(THREAD_ID_KEY).await?;
                self.assistant(text, tags, thread_id)
            }
            Mode::Companion => {
                let history = store.all_messages().await?;
                self.companion(text, tags, &history)
            }
        }
    }

    /// Profile block, then the tag block, then the question, separated by blank lines.
    /// Empty blocks are left out.
    pub fn assistant(
        &self,
        text: &str,
        tags: &[DrugTag],
        thread_id: Option<String>,
    ) -> Result<Payload> {
        validate(text, tags)?;

        let mut blocks = vec![self.profile.render()];
        if !tags.is_empty() {
            let lines = tags
                .iter()
                .map(|t| format!("- {}", t.label()))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(format!("[Medications in question]\n{lines}"));
        }
        let text = text.trim();
        if !text.is_empty() {
            blocks.push(format!("[Question]\n{text}"));
        }

        let message = blocks.join("\n\n");
        tracing::debug!(
            tags = tags.len(),
            has_thread = thread_id.is_some(),
            "built assistant request"
        );

        Ok(Payload::Assistant(AssistantRequest { message, thread_id }))
    }

    /// System preamble, the full log in order, then the new user turn.
    ///
    /// Tags are not part of companion requests. The log includes turns written
    /// in assistant mode because both modes share it.
    pub fn companion(&self, text: &str, tags: &[DrugTag], history: &[Message]) -> Result<Payload> {
        validate(text, tags)?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage::new(Role::System, self.system_prompt.clone()));
        messages.extend(history.iter().map(WireMessage::from));
        messages.push(WireMessage::new(Role::User, text.trim()));

        tracing::debug!(messages = messages.len(), "built companion request");

        Ok(Payload::Companion(ChatRequest { messages }))
    }
}

fn validate(text: &str, tags: &[DrugTag]) -> Result<()> {
    if text.trim().is_empty() && tags.is_empty() {
        return Err(ChatError::Validation(
            "enter a question or attach a drug".to_string(),
        ));
    }
    Ok(())
}
