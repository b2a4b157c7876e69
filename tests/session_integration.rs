//! Integration tests for conversational turns against in-process fakes.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Notify;

use medchat::core::request::Payload;
use medchat::core::storage::THREAD_ID_KEY;
use medchat::core::{
    AssistantClient, ChatError, ChatSession, DrugTag, FALLBACK_REPLY, MemoryStore, Mode, Profile,
    Reply, RequestBuilder, Role, SqliteStore, Store,
};

/// Answers every request with a fixed reply and records the payloads.
struct EchoClient {
    thread_id: Option<String>,
    sent: Mutex<Vec<Payload>>,
}

impl EchoClient {
    fn new(thread_id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            thread_id: thread_id.map(str::to_string),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<Payload> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl AssistantClient for EchoClient {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn send(&self, payload: &Payload) -> medchat::core::Result<Reply> {
        self.sent.lock().push(payload.clone());
        Ok(Reply {
            reply: format!("reply #{}", self.sent.lock().len()),
            thread_id: self.thread_id.clone(),
        })
    }
}

/// Holds every request until released.
#[derive(Default)]
struct GatedClient {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl AssistantClient for GatedClient {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn send(&self, _payload: &Payload) -> medchat::core::Result<Reply> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Reply {
            reply: "done".to_string(),
            thread_id: None,
        })
    }
}

fn builder() -> RequestBuilder {
    let profile = Profile {
        age: "67".to_string(),
        medications: "warfarin".to_string(),
        ..Default::default()
    };
    RequestBuilder::new(profile, "You are a kind listener.")
}

fn session_with(store: Arc<dyn Store>, client: Arc<dyn AssistantClient>) -> ChatSession {
    ChatSession::new(store, client, builder())
}

#[tokio::test]
async fn assistant_turn_composes_profile_tags_and_question() {
    let store = Arc::new(MemoryStore::new());
    let client = EchoClient::new(Some("thread_abc"));
    let session = session_with(store.clone(), client.clone());

    session.attach(DrugTag::new("d1", "Tylenol", "acetaminophen"));
    session.attach(DrugTag::new("d2", "Advil", "ibuprofen"));
    let reply = session.ask("Can I take these together?").await.unwrap();
    assert_eq!(reply, "reply #1");

    let sent = client.sent();
    let Payload::Assistant(request) = &sent[0] else {
        panic!("expected assistant payload");
    };
    assert_eq!(
        request.message,
        "[User profile]\n- Age: 67\n- Gender: none\n- Conditions: none\n- Current medications: warfarin\n\n\
         [Medications in question]\n- Tylenol(acetaminophen)\n- Advil(ibuprofen)\n\n\
         [Question]\nCan I take these together?"
    );
    assert_eq!(request.thread_id, None);

    // The raw question is what lands in the log.
    let log = store.all_messages().await.unwrap();
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[0].content, "Can I take these together?");
    assert_eq!(log[1].role, Role::Assistant);
    assert!(session.pending().is_empty());
}

#[tokio::test]
async fn thread_id_continues_across_turns() {
    let store = Arc::new(MemoryStore::new());
    let client = EchoClient::new(Some("thread_abc"));
    let session = session_with(store.clone(), client.clone());

    session.ask("first").await.unwrap();
    session.ask("second").await.unwrap();
    session.ask("third").await.unwrap();

    let thread_ids: Vec<Option<String>> = client
        .sent()
        .iter()
        .map(|p| p.thread_id().map(str::to_string))
        .collect();
    assert_eq!(
        thread_ids,
        [None, Some("thread_abc".to_string()), Some("thread_abc".to_string())]
    );
    assert_eq!(store.all_messages().await.unwrap().len(), 6);
}

#[tokio::test]
async fn companion_turn_sends_preamble_history_and_new_turn() {
    let store = Arc::new(MemoryStore::new());
    let client = EchoClient::new(None);
    let session = session_with(store.clone(), client.clone());

    session.ask("what is ibuprofen?").await.unwrap();
    session.set_mode(Mode::Companion);
    session.attach(DrugTag::new("d1", "Advil", "ibuprofen"));
    session.ask("I feel anxious").await.unwrap();

    let sent = client.sent();
    let Payload::Companion(request) = &sent[1] else {
        panic!("expected companion payload");
    };
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(request.messages[0].content, "You are a kind listener.");
    assert_eq!(request.messages[1].content, "what is ibuprofen?");
    assert_eq!(request.messages[3].content, "I feel anxious");
    assert!(
        request
            .messages
            .iter()
            .all(|m| !m.content.contains("Advil(ibuprofen)"))
    );

    assert!(session.pending().is_empty());
    assert_eq!(store.all_messages().await.unwrap().len(), 4);
}

#[tokio::test]
async fn tags_alone_are_a_valid_submission() {
    let store = Arc::new(MemoryStore::new());
    let client = EchoClient::new(None);
    let session = session_with(store, client.clone());

    session.attach(DrugTag::new("d1", "Tylenol", "acetaminophen"));
    session.ask("").await.unwrap();

    let Payload::Assistant(request) = &client.sent()[0] else {
        panic!("expected assistant payload");
    };
    assert!(request.message.ends_with("- Tylenol(acetaminophen)"));
    assert!(!request.message.contains("[Question]"));
}

#[tokio::test]
async fn duplicate_tags_are_ignored_and_drop_removes_by_position() {
    let session = session_with(Arc::new(MemoryStore::new()), EchoClient::new(None));

    assert!(session.attach(DrugTag::new("d1", "Tylenol", "acetaminophen")));
    assert!(!session.attach(DrugTag::new("d1", "Tylenol", "acetaminophen")));
    assert!(session.attach(DrugTag::new("d2", "Advil", "ibuprofen")));

    assert_eq!(session.display_question("ok?"), "[Tylenol] [Advil] ok?");
    assert_eq!(session.detach(0).map(|t| t.id), Some("d1".to_string()));
    assert_eq!(session.detach(5), None);
    assert_eq!(session.pending().len(), 1);
}

#[tokio::test]
async fn concurrent_turn_is_rejected() {
    let client = Arc::new(GatedClient::default());
    let store = Arc::new(MemoryStore::new());
    let session = session_with(store.clone(), client.clone());

    let first = session.ask("one");
    let second = async {
        client.entered.notified().await;
        session.attach(DrugTag::new("d1", "Tylenol", "acetaminophen"));
        let result = session.ask("two").await;
        let kept = session.pending().len();
        client.release.notify_one();
        (result, kept)
    };
    let (first, (second, kept)) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), "done");
    assert!(matches!(second, Err(ChatError::ExchangeInProgress)));
    assert_eq!(kept, 1);
    assert_eq!(session.pending().len(), 1);
    assert!(!session.is_busy());

    let log = store.all_messages().await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].content, "one");
}

#[tokio::test]
async fn reset_forgets_log_and_thread() {
    let store = Arc::new(MemoryStore::new());
    let client = EchoClient::new(Some("thread_abc"));
    let session = session_with(store.clone(), client.clone());

    session.ask("first").await.unwrap();
    session.reset().await.unwrap();

    assert!(session.history().await.unwrap().is_empty());
    assert_eq!(store.get_metadata(THREAD_ID_KEY).await.unwrap(), None);

    session.ask("again").await.unwrap();
    assert_eq!(client.sent()[1].thread_id(), None);
}

#[tokio::test]
async fn closed_store_reads_empty_and_turns_fall_back() {
    let store = Arc::new(MemoryStore::new());
    store.close();
    let client = EchoClient::new(None);
    let session = session_with(store, client.clone());

    assert!(session.history().await.unwrap().is_empty());
    assert_eq!(session.respond("hello").await, FALLBACK_REPLY);
    assert!(matches!(
        session.ask("hello").await,
        Err(ChatError::PersistenceUnavailable(_))
    ));
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn sqlite_session_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("medchat.db");
    let client = EchoClient::new(Some("thread_abc"));

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let session = session_with(store, client.clone());
        session.ask("before restart").await.unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let session = session_with(store, client.clone());
    let history = session.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "before restart");

    session.ask("after restart").await.unwrap();
    assert_eq!(client.sent()[1].thread_id(), Some("thread_abc"));
}
