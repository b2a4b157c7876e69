//! Per-user chat session.
//!
//! A [`ChatSession`] is the single owner of the active mode, the pending drug
//! tags and the store handle. The interface layer holds one and calls into it
//! for every turn.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::annotation::{DrugTag, PendingAnnotations};
use super::client::AssistantClient;
use super::error::{ChatError, Result};
use super::message::Message;
use super::mode::{Mode, ModeController};
use super::request::RequestBuilder;
use super::storage::{Exchange, Store, StoreError};

/// Reply shown to the user whenever a turn fails.
pub const FALLBACK_REPLY: &str = "Something went wrong. Please try again in a moment.";

/// Greeting shown when the history is empty.
pub const WELCOME_MESSAGE: &str = "Hello! Ask me anything.";

/// Marks an exchange as running; released on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Session context for one conversation surface.
pub struct ChatSession {
    store: Arc<dyn Store>,
    client: Arc<dyn AssistantClient>,
    builder: RequestBuilder,
    modes: Mutex<ModeController>,
    pending: Mutex<PendingAnnotations>,
    in_flight: AtomicBool,
}

impl ChatSession {
    /// Create a session starting in assistant mode.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        client: Arc<dyn AssistantClient>,
        builder: RequestBuilder,
    ) -> Self {
        Self {
            store,
            client,
            builder,
            modes: Mutex::new(ModeController::default()),
            pending: Mutex::new(PendingAnnotations::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Start in `mode` instead of the default.
    #[must_use]
    pub fn with_mode(self, mode: Mode) -> Self {
        self.modes.lock().set_mode(mode);
        self
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.modes.lock().active_mode()
    }

    /// Switch modes. History is kept; only later requests change.
    pub fn set_mode(&self, mode: Mode) {
        self.modes.lock().set_mode(mode);
        tracing::debug!(%mode, "mode switched");
    }

    pub fn toggle_mode(&self) -> Mode {
        let mode = self.modes.lock().toggle();
        tracing::debug!(%mode, "mode switched");
        mode
    }

    /// Attach a tag to the next question. Duplicate ids are ignored.
    pub fn attach(&self, tag: DrugTag) -> bool {
        self.pending.lock().add(tag)
    }

    /// Detach the tag at `index`.
    pub fn detach(&self, index: usize) -> Option<DrugTag> {
        self.pending.lock().remove(index)
    }

    #[must_use]
    pub fn pending(&self) -> Vec<DrugTag> {
        self.pending.lock().tags().to_vec()
    }

    /// The question as it is echoed back, tag names first.
    #[must_use]
    pub fn display_question(&self, text: &str) -> String {
        self.pending.lock().display_question(text)
    }

    /// Whether a turn is currently running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn history(&self) -> Result<Vec<Message>> {
        Ok(self.store.all_messages().await?)
    }

    /// Forget the whole conversation, including the assistant thread.
    pub async fn reset(&self) -> Result<()> {
        self.store.reset().await?;
        Ok(())
    }

    /// Run one turn and return the reply.
    ///
    /// Pending tags are consumed by every turn that gets past the in-flight
    /// check, whatever its outcome. On success the user turn, the reply and
    /// any new thread id are persisted together; on failure nothing is.
    pub async fn ask(&self, text: &str) -> Result<String> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::warn!("rejected turn while another is in progress");
            return Err(ChatError::ExchangeInProgress);
        };

        let mode = self.mode();
        let tags = self.pending.lock().take();
        let text = text.trim();

        if !self.store.is_open() {
            return Err(ChatError::PersistenceUnavailable(StoreError::Unavailable(format!(
                "{} store is not open",
                self.store.name()
            ))));
        }

        let payload = self
            .builder
            .build(mode, text, &tags, self.store.as_ref())
            .await?;
        let user = Message::user(text);

        let reply = self.client.send(&payload).await?;
        tracing::info!(%mode, client = self.client.name(), "received reply");

        let thread_id = match mode {
            Mode::Assistant => reply.thread_id,
            Mode::Companion => None,
        };
        self.store
            .record_exchange(Exchange {
                user,
                reply: Message::assistant(reply.reply.clone()),
                thread_id,
            })
            .await?;

        Ok(reply.reply)
    }

    /// Like [`ask`](Self::ask), but any failure becomes [`FALLBACK_REPLY`].
    pub async fn respond(&self, text: &str) -> String {
        match self.ask(text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use crate::core::client::Reply;
    use crate::core::profile::Profile;
    use crate::core::request::Payload;
    use crate::core::storage::{MemoryStore, THREAD_ID_KEY};

    /// Client that answers from a script and remembers what it was sent.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<Reply>>>,
        sent: Mutex<Vec<Payload>>,
    }

    impl ScriptedClient {
        fn answering(replies: Vec<Result<Reply>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AssistantClient for ScriptedClient {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn send(&self, payload: &Payload) -> Result<Reply> {
            self.sent.lock().push(payload.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::Transport("script exhausted".to_string())))
        }
    }

    fn reply(text: &str, thread_id: Option<&str>) -> Result<Reply> {
        Ok(Reply {
            reply: text.to_string(),
            thread_id: thread_id.map(str::to_string),
        })
    }

    fn session(client: Arc<ScriptedClient>) -> (ChatSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let session = ChatSession::new(
            store.clone(),
            client,
            RequestBuilder::new(Profile::default(), "be kind"),
        );
        (session, store)
    }

    #[tokio::test]
    async fn success_persists_user_turn_then_reply() {
        let client = ScriptedClient::answering(vec![reply("hi there", Some("T1"))]);
        let (session, store) = session(client);

        let answer = session.ask("  hello ").await.unwrap();
        assert_eq!(answer, "hi there");

        let log = store.all_messages().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], Message { timestamp: log[0].timestamp, ..Message::user("hello") });
        assert_eq!(log[1].content, "hi there");
        assert_eq!(
            store.get_metadata(THREAD_ID_KEY).await.unwrap().as_deref(),
            Some("T1")
        );
    }

    #[tokio::test]
    async fn thread_id_is_sent_on_the_next_turn() {
        let client = ScriptedClient::answering(vec![
            reply("one", Some("T1")),
            reply("two", Some("T1")),
        ]);
        let (session, _store) = session(client.clone());

        session.ask("first").await.unwrap();
        session.ask("second").await.unwrap();

        let sent = client.sent.lock();
        assert_eq!(sent[0].thread_id(), None);
        assert_eq!(sent[1].thread_id(), Some("T1"));
    }

    #[tokio::test]
    async fn remote_error_leaves_store_untouched_and_clears_tags() {
        let client = ScriptedClient::answering(vec![Err(ChatError::Remote {
            status: 500,
            body: "boom".to_string(),
        })]);
        let (session, store) = session(client);
        store.append(Message::user("earlier")).await.unwrap();
        session.attach(DrugTag::new("1", "X", "Y"));

        let err = session.ask("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Remote { status: 500, .. }));
        assert_eq!(store.all_messages().await.unwrap().len(), 1);
        assert!(session.pending().is_empty());
    }

    #[tokio::test]
    async fn companion_replies_do_not_store_thread_ids() {
        let client = ScriptedClient::answering(vec![reply("there there", Some("X"))]);
        let (session, store) = session(client.clone());
        session.set_mode(Mode::Companion);

        session.ask("sad").await.unwrap();

        assert_eq!(store.get_metadata(THREAD_ID_KEY).await.unwrap(), None);
        assert_eq!(client.sent.lock()[0].endpoint(), "/chat");
    }

    #[tokio::test]
    async fn validation_failure_makes_no_call() {
        let client = ScriptedClient::answering(vec![]);
        let (session, store) = session(client.clone());

        let err = session.ask("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(client.sent.lock().is_empty());
        assert!(store.all_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_is_persistence_unavailable() {
        let client = ScriptedClient::answering(vec![reply("ok", Some("T1"))]);
        let (session, store) = session(client.clone());
        store.close();
        session.attach(DrugTag::new("1", "X", "Y"));

        let err = session.ask("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::PersistenceUnavailable(_)));
        assert!(client.sent.lock().is_empty());
        assert!(session.pending().is_empty());
    }

    #[tokio::test]
    async fn respond_translates_errors_to_fallback() {
        let client = ScriptedClient::answering(vec![Err(ChatError::Transport(
            "refused".to_string(),
        ))]);
        let (session, _store) = session(client);

        assert_eq!(session.respond("hello").await, FALLBACK_REPLY);
        assert_eq!(session.respond("").await, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn switching_modes_keeps_history() {
        let client = ScriptedClient::answering(vec![reply("a", None)]);
        let (session, store) = session(client);
        session.ask("q").await.unwrap();
        let before = store.all_messages().await.unwrap();

        session.toggle_mode();
        session.toggle_mode();

        assert_eq!(session.mode(), Mode::Assistant);
        assert_eq!(store.all_messages().await.unwrap(), before);
    }

    #[test]
    fn in_flight_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());
        drop(first);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
