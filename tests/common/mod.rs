//! Shared test harness: a scriptable in-memory backend, temp stores, and a
//! fully wired view model.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use policychat::auth::{Session, StaticSessionProvider};
use policychat::chat::ConversationViewModel;
use policychat::error::{ChatError, Result};
use policychat::ids::ConversationId;
use policychat::notify::MemoryNotifier;
use policychat::remote::{DocumentReceipt, RemoteBackend};
use policychat::store::DurableStore;
use policychat::sync::{Connectivity, SyncEngine};
use policychat::types::{ChatMessage, Conversation, DeliveryState, Settings, UserProfile};

/// In-memory backend whose failures are scripted per test.
#[derive(Default)]
pub struct ScriptedBackend {
    pub conversations: Mutex<Vec<Conversation>>,
    pub messages: Mutex<HashMap<ConversationId, Vec<ChatMessage>>>,
    pub answer: Mutex<String>,
    pub upload_chunks: AtomicU32,

    pub fail_ask: AtomicBool,
    pub fail_append: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fail_create: AtomicBool,
    /// Delay applied to page fetches, for racing loads against selection
    /// changes.
    pub fetch_delay_ms: AtomicU64,

    pub ask_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub append_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.answer.lock().unwrap() = "scripted answer".to_string();
        backend.upload_chunks.store(3, Ordering::SeqCst);
        backend
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.conversations.lock().unwrap().push(conversation);
    }

    pub fn seed_messages(&self, conversation_id: &ConversationId, messages: Vec<ChatMessage>) {
        self.messages
            .lock()
            .unwrap()
            .insert(conversation_id.clone(), messages);
    }
}

#[async_trait]
impl RemoteBackend for ScriptedBackend {
    async fn ask(
        &self,
        _user_id: &str,
        _conversation_id: &ConversationId,
        _history: &[ChatMessage],
    ) -> Result<String> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ask.load(Ordering::SeqCst) {
            return Err(ChatError::remote("boom"));
        }
        Ok(self.answer.lock().unwrap().clone())
    }

    async fn upload_document(
        &self,
        _conversation_id: &ConversationId,
        filename: &str,
        _content: Vec<u8>,
    ) -> Result<DocumentReceipt> {
        Ok(DocumentReceipt {
            text: Some("extracted".to_string()),
            filename: filename.to_string(),
            chunks: self.upload_chunks.load(Ordering::SeqCst),
        })
    }

    async fn list_conversations(&self, _user_id: &str) -> Result<Vec<Conversation>> {
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn create_conversation(&self, _user_id: &str, title: &str) -> Result<Conversation> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ChatError::remote("cannot create"));
        }
        let conversation = Conversation::new(ConversationId::random(), title);
        self.conversations.lock().unwrap().push(conversation.clone());
        Ok(conversation)
    }

    async fn rename_conversation(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<()> {
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(c) = conversations.iter_mut().find(|c| &c.id == conversation_id) {
            c.title = title.to_string();
        }
        Ok(())
    }

    async fn delete_conversation(
        &self,
        conversation_id: &ConversationId,
        _session: &Session,
    ) -> Result<()> {
        self.conversations
            .lock()
            .unwrap()
            .retain(|c| &c.id != conversation_id);
        Ok(())
    }

    async fn fetch_messages_page(
        &self,
        conversation_id: &ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ChatError::remote("fetch failed"));
        }
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(conversation_id)
            .map(|all| all.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<ChatMessage> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(ChatError::remote("append failed"));
        }
        // The server assigns its own message id.
        let confirmed = ChatMessage {
            id: Uuid::new_v4(),
            delivery: DeliveryState::Confirmed,
            ..message.clone()
        };
        self.messages
            .lock()
            .unwrap()
            .entry(message.conversation_id.clone())
            .or_default()
            .push(confirmed.clone());
        Ok(confirmed)
    }

    async fn update_settings(&self, _user_id: &str, _settings: &Settings) -> Result<()> {
        Ok(())
    }

    async fn update_user_data(&self, _profile: &UserProfile) -> Result<()> {
        Ok(())
    }
}

/// A fully wired view model over a temp store and a scripted backend.
pub struct Harness {
    pub dir: TempDir,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<DurableStore>,
    pub engine: Arc<SyncEngine>,
    pub notifier: Arc<MemoryNotifier>,
    pub chat: ConversationViewModel,
}

pub async fn harness(initial: Connectivity) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(
        DurableStore::open_at(&dir.path().join("test.db"))
            .await
            .expect("open store"),
    );
    let backend = Arc::new(ScriptedBackend::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = Arc::new(SyncEngine::new(
        backend.clone(),
        store.clone(),
        notifier.clone(),
        initial,
    ));
    let session = Arc::new(StaticSessionProvider::signed_in("user-1", "token-1"));
    let chat = ConversationViewModel::new(
        backend.clone(),
        store.clone(),
        engine.clone(),
        session,
        notifier.clone(),
    );
    Harness {
        dir,
        backend,
        store,
        engine,
        notifier,
        chat,
    }
}

/// Make the user in `harness` premium (all entitlement gates open).
pub async fn make_premium(store: &DurableStore) {
    let profile = UserProfile {
        id: "user-1".to_string(),
        email: "user@example.com".to_string(),
        full_name: None,
        membership_status: "premium".to_string(),
        premium_start_date: None,
        premium_end_date: None,
    };
    store.save_user_profile(&profile).await.expect("save profile");
}

/// A backing history of `count` confirmed messages in one conversation.
pub fn history(conversation_id: &ConversationId, count: usize) -> Vec<ChatMessage> {
    (0..count)
        .map(|i| ChatMessage::ai(conversation_id.clone(), format!("answer {i}")))
        .collect()
}
