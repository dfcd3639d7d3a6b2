//! # Conversation View Model
//!
//! The authoritative in-memory message list for the active conversation,
//! reconciling three sources: optimistic local inserts, server-confirmed
//! writes, and paginated history fetches.
//!
//! ## Send flow
//!
//! Online, a send is optimistic-then-confirm: the draft appears immediately
//! under a temporary id (and the placeholder conversation id when no
//! conversation exists yet), the conversation is created if needed and every
//! placeholder-tagged message is rewritten to the real id in one pass, the
//! user turn is persisted and its temporary entry swapped for the confirmed
//! record in place, and the AI answer is appended. A failed AI turn marks
//! the user message with an error flag and posts a conversation-visible
//! error entry; the user message is never lost.
//!
//! Offline, the draft is cached durably, queued for replay, and a
//! synthesized advisory tells the user it will send on reconnect.
//!
//! ## Entitlements
//!
//! Free-tier limits are enforced here, before any mutation or network call,
//! not just hidden in the UI.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{Session, SessionProvider};
use crate::chat::pagination::{Paginator, PAGE_SIZE};
use crate::error::{ChatError, Result};
use crate::ids::ConversationId;
use crate::notify::{Notice, Notifier};
use crate::offline::Action;
use crate::remote::RemoteBackend;
use crate::store::{DurableStore, StoreKey};
use crate::sync::SyncEngine;
use crate::types::{
    ChatMessage, Conversation, DeliveryState, MessageSender, Settings, StoredDocument,
    UserProfile,
};

/// Maximum conversations a free-tier user may hold.
pub const FREE_CONVERSATION_LIMIT: usize = 1;
/// Maximum AI turns per conversation on the free tier.
pub const FREE_AI_MESSAGE_LIMIT: usize = 10;

/// Mutable view state, guarded by one lock so multi-field updates (the
/// placeholder rewrite, conversation switches) are observably atomic.
#[derive(Debug)]
struct ViewState {
    active: Option<ConversationId>,
    conversations: Vec<Conversation>,
    messages: Vec<ChatMessage>,
    paginator: Paginator,
    /// Bumped on every conversation switch; in-flight loads compare against
    /// it and discard their result when it moved.
    load_generation: u64,
}

impl ViewState {
    fn new() -> Self {
        Self {
            active: None,
            conversations: Vec::new(),
            messages: Vec::new(),
            paginator: Paginator::new(),
            load_generation: 0,
        }
    }
}

/// View model for the conversation list and the active conversation.
pub struct ConversationViewModel {
    backend: Arc<dyn RemoteBackend>,
    store: Arc<DurableStore>,
    engine: Arc<SyncEngine>,
    session: Arc<dyn SessionProvider>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<ViewState>,
}

impl ConversationViewModel {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        store: Arc<DurableStore>,
        engine: Arc<SyncEngine>,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            store,
            engine,
            session,
            notifier,
            state: RwLock::new(ViewState::new()),
        }
    }

    /// Snapshot of the active conversation's messages, in display order.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    /// Snapshot of the conversation list.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    /// The active conversation id, if one is selected.
    pub async fn active_conversation(&self) -> Option<ConversationId> {
        self.state.read().await.active.clone()
    }

    /// Whether older history remains to be paged in.
    pub async fn has_more_history(&self) -> bool {
        self.state.read().await.paginator.has_more()
    }

    /// Append a message to the in-memory list without persisting or sending
    /// it. Used by hosts to seed pre-conversation context (greeting turns,
    /// drafts restored from another surface) before a conversation exists.
    pub async fn append_local(&self, message: ChatMessage) {
        self.state.write().await.messages.push(message);
    }

    /// Load the conversation list: remote when possible, cached otherwise
    /// (with a staleness advisory). Never fails; an empty list is the floor.
    pub async fn load_conversations(&self) -> Vec<Conversation> {
        let fetched = match self.session.session().await {
            Some(session) if self.engine.is_online().await => {
                match self.backend.list_conversations(&session.user_id).await {
                    Ok(list) => {
                        if let Err(err) = self.store.save(&StoreKey::Conversations, &list).await {
                            warn!(error = %err, "could not cache conversation list");
                        }
                        Some(list)
                    }
                    Err(err) => {
                        warn!(error = %err, "conversation list fetch failed, falling back to cache");
                        None
                    }
                }
            }
            _ => None,
        };

        let (list, stale) = match fetched {
            Some(list) => (list, false),
            None => (self.store.load_conversations().await, true),
        };
        if stale && !list.is_empty() {
            self.notifier.notify(Notice::Warning(
                "Showing locally cached conversations; they may be out of date.".to_string(),
            ));
        }
        self.state.write().await.conversations = list.clone();
        list
    }

    /// Make `conversation_id` the active conversation and load its history:
    /// remote-first with a durable cache fallback. Never fails; the worst
    /// case is an empty list plus a staleness advisory. A result arriving
    /// after the selection changed again is discarded.
    pub async fn select_conversation(&self, conversation_id: ConversationId) {
        let generation = {
            let mut state = self.state.write().await;
            state.load_generation += 1;
            state.active = Some(conversation_id.clone());
            state.messages.clear();
            state.paginator = Paginator::new();
            state.load_generation
        };

        let fetched = if self.engine.is_online().await {
            match self
                .backend
                .fetch_messages_page(&conversation_id, 0, PAGE_SIZE)
                .await
            {
                Ok(messages) => {
                    if let Err(err) = self.store.save_messages(&conversation_id, &messages).await {
                        warn!(error = %err, "could not cache fetched messages");
                    }
                    Some(messages)
                }
                Err(err) => {
                    warn!(error = %err, "message fetch failed, falling back to cache");
                    None
                }
            }
        } else {
            None
        };

        let (messages, stale) = match fetched {
            Some(messages) => (messages, false),
            None => (self.store.load_messages(&conversation_id).await, true),
        };

        let mut state = self.state.write().await;
        if state.load_generation != generation {
            debug!(conversation_id = %conversation_id, "selection changed mid-load, discarding result");
            return;
        }
        state.paginator = Paginator::after_initial_load(messages.len());
        state.messages = messages;
        drop(state);

        if stale {
            self.notifier.notify(Notice::Warning(
                "Showing locally cached messages; they may be out of date.".to_string(),
            ));
        }
    }

    /// Page in the next block of older history. Collapses to a no-op when a
    /// load is in flight or the history is exhausted. Returns the number of
    /// messages appended.
    pub async fn load_more_messages(&self) -> Result<usize> {
        let (conversation_id, offset, generation) = {
            let mut state = self.state.write().await;
            let Some(active) = state.active.clone() else {
                return Ok(0);
            };
            let Some(offset) = state.paginator.begin_load() else {
                return Ok(0);
            };
            (active, offset, state.load_generation)
        };

        match self
            .backend
            .fetch_messages_page(&conversation_id, offset, PAGE_SIZE)
            .await
        {
            Ok(page) => {
                let mut state = self.state.write().await;
                if state.load_generation != generation {
                    // The paginator was replaced by the new selection.
                    debug!("selection changed mid page load, discarding page");
                    return Ok(0);
                }
                state.paginator.complete_load(page.len());
                let count = page.len();
                state.messages.extend(page);
                Ok(count)
            }
            Err(err) => {
                let mut state = self.state.write().await;
                if state.load_generation == generation {
                    state.paginator.abort_load();
                }
                Err(err)
            }
        }
    }

    /// Send a user message in the active conversation, creating one when
    /// none is active (online only). See the module docs for the full flow.
    pub async fn send_message(&self, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let session = self
            .session
            .session()
            .await
            .ok_or(ChatError::Unauthenticated)?;

        let (active, conversation_count, ai_turns) = {
            let state = self.state.read().await;
            // The AI-turn count covers the messages paged in so far, so a
            // long history under-counts until older pages load. This gate is
            // a client-side courtesy; the server enforces the real limit.
            (
                state.active.clone(),
                state.conversations.len(),
                state
                    .messages
                    .iter()
                    .filter(|m| m.sender == MessageSender::Ai)
                    .count(),
            )
        };

        self.check_entitlements(active.is_none(), conversation_count, ai_turns)
            .await?;

        if self.engine.is_online().await {
            self.send_online(&session, active, content).await
        } else {
            let Some(conversation_id) = active else {
                let advisory =
                    "You are offline; reconnect to start a new conversation.".to_string();
                self.notifier.notify(Notice::Warning(advisory.clone()));
                return Err(ChatError::MissingConversation(advisory));
            };
            self.send_offline(&session, &conversation_id, content).await
        }
    }

    /// Free-tier gates, evaluated before any mutation or network call.
    async fn check_entitlements(
        &self,
        starting_new: bool,
        conversation_count: usize,
        ai_turns: usize,
    ) -> Result<()> {
        let premium = self
            .store
            .load_user_profile()
            .await
            .map(|p| p.is_premium())
            .unwrap_or(false);
        if premium {
            return Ok(());
        }

        if starting_new && conversation_count >= FREE_CONVERSATION_LIMIT {
            let advisory = format!(
                "Free accounts are limited to {FREE_CONVERSATION_LIMIT} conversation(s). Upgrade to start another."
            );
            self.notifier.notify(Notice::Warning(advisory.clone()));
            return Err(ChatError::Entitlement(advisory));
        }
        if ai_turns >= FREE_AI_MESSAGE_LIMIT {
            let advisory = format!(
                "Free accounts are limited to {FREE_AI_MESSAGE_LIMIT} answers per conversation. Upgrade to continue."
            );
            self.notifier.notify(Notice::Warning(advisory.clone()));
            return Err(ChatError::Entitlement(advisory));
        }
        Ok(())
    }

    async fn send_online(
        &self,
        session: &Session,
        active: Option<ConversationId>,
        content: &str,
    ) -> Result<()> {
        // Optimistic insert. Drafts for a conversation that does not exist
        // yet carry the placeholder id.
        let draft_conversation = active
            .clone()
            .unwrap_or_else(ConversationId::placeholder);
        let pending = ChatMessage::user(draft_conversation, content);
        let temp_id = pending.id;
        self.state.write().await.messages.push(pending);

        let conversation_id = match active {
            Some(id) => id,
            None => match self.create_active_conversation(session, content).await {
                Ok(id) => id,
                Err(err) => {
                    self.mark_error(temp_id).await;
                    self.notifier.notify(Notice::Error(
                        "Could not start a new conversation.".to_string(),
                    ));
                    return Err(err);
                }
            },
        };

        // Persist the user turn; swap the temporary entry for the confirmed
        // record without moving it.
        let to_send = {
            let state = self.state.read().await;
            match state.messages.iter().find(|m| m.id == temp_id) {
                Some(msg) => msg.clone(),
                None => ChatMessage::user(conversation_id.clone(), content),
            }
        };
        let confirmed_id = match self.backend.append_message(&to_send).await {
            Ok(confirmed) => {
                let confirmed_id = confirmed.id;
                let mut state = self.state.write().await;
                if let Some(slot) = state.messages.iter_mut().find(|m| m.id == temp_id) {
                    *slot = ChatMessage {
                        delivery: DeliveryState::Confirmed,
                        ..confirmed
                    };
                }
                confirmed_id
            }
            Err(err) => {
                self.mark_error(temp_id).await;
                self.notifier.notify(Notice::Error(
                    "Your message could not be sent. It remains here so you can retry."
                        .to_string(),
                ));
                return Err(err);
            }
        };

        // AI turn over the full history, including the just-confirmed turn.
        let history = self.state.read().await.messages.clone();
        match self
            .backend
            .ask(&session.user_id, &conversation_id, &history)
            .await
        {
            Ok(answer) => {
                let snapshot = {
                    let mut state = self.state.write().await;
                    state
                        .messages
                        .push(ChatMessage::ai(conversation_id.clone(), answer));
                    state.messages.clone()
                };
                self.store.save_messages(&conversation_id, &snapshot).await?;
                Ok(())
            }
            Err(err) => {
                // A failed answer is not a lost question: flag the user turn
                // and show the failure inside the conversation.
                self.mark_error(confirmed_id).await;
                let snapshot = {
                    let mut state = self.state.write().await;
                    state.messages.push(ChatMessage::error(
                        conversation_id.clone(),
                        format!("The assistant could not answer: {err}"),
                    ));
                    state.messages.clone()
                };
                if let Err(cache_err) =
                    self.store.save_messages(&conversation_id, &snapshot).await
                {
                    warn!(error = %cache_err, "could not cache messages after failed AI turn");
                }
                self.notifier.notify(Notice::Error(
                    "The assistant could not answer. Your message was saved.".to_string(),
                ));
                Ok(())
            }
        }
    }

    /// Create a conversation for the draft being sent, then rewrite every
    /// placeholder-tagged message to the real id in one locked pass.
    async fn create_active_conversation(
        &self,
        session: &Session,
        first_message: &str,
    ) -> Result<ConversationId> {
        let conversation = self
            .backend
            .create_conversation(&session.user_id, &derive_title(first_message))
            .await?;
        self.store.upsert_conversation(&conversation).await?;

        let mut state = self.state.write().await;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.conversation_id.is_placeholder())
        {
            message.conversation_id = conversation.id.clone();
        }
        state.conversations.insert(0, conversation.clone());
        state.active = Some(conversation.id.clone());
        Ok(conversation.id)
    }

    async fn send_offline(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
        content: &str,
    ) -> Result<()> {
        let pending = ChatMessage::user(conversation_id.clone(), content);
        let snapshot = {
            let mut state = self.state.write().await;
            state.messages.push(pending);
            state.messages.clone()
        };
        // Cache before queueing so a reload cannot lose the draft.
        self.store.save_messages(conversation_id, &snapshot).await?;
        self.engine
            .queue_action(Action::SendMessage {
                conversation_id: conversation_id.clone(),
                user_id: session.user_id.clone(),
                content: content.to_string(),
            })
            .await?;

        self.state.write().await.messages.push(ChatMessage::system(
            conversation_id.clone(),
            "You are offline. This message is queued and will be sent when the connection returns.",
        ));
        Ok(())
    }

    async fn mark_error(&self, message_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
            message.error = true;
            message.delivery = DeliveryState::Failed;
        }
    }

    /// Rename a conversation. Remote-first and online-only; the local list
    /// and cache are updated after the server confirms.
    pub async fn rename_conversation(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<()> {
        if !self.engine.is_online().await {
            let advisory = "Renaming requires a connection.".to_string();
            self.notifier.notify(Notice::Warning(advisory.clone()));
            return Err(ChatError::Remote(advisory));
        }
        self.backend
            .rename_conversation(conversation_id, title)
            .await?;

        let updated = {
            let mut state = self.state.write().await;
            let updated = state
                .conversations
                .iter_mut()
                .find(|c| &c.id == conversation_id)
                .map(|c| {
                    c.title = title.to_string();
                    c.updated_at = chrono::Utc::now();
                    c.clone()
                });
            updated
        };
        if let Some(conversation) = updated {
            self.store.upsert_conversation(&conversation).await?;
        }
        Ok(())
    }

    /// Delete a conversation. Requires a session and a premium membership,
    /// and a connection; local caches are dropped after the server confirms.
    pub async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        let session = self
            .session
            .session()
            .await
            .ok_or(ChatError::Unauthenticated)?;
        let premium = self
            .store
            .load_user_profile()
            .await
            .map(|p| p.is_premium())
            .unwrap_or(false);
        if !premium {
            let advisory = "Deleting conversations requires a premium membership.".to_string();
            self.notifier.notify(Notice::Warning(advisory.clone()));
            return Err(ChatError::Entitlement(advisory));
        }
        if !self.engine.is_online().await {
            let advisory = "Deleting requires a connection.".to_string();
            self.notifier.notify(Notice::Warning(advisory.clone()));
            return Err(ChatError::Remote(advisory));
        }

        self.backend
            .delete_conversation(conversation_id, &session)
            .await?;
        self.store.delete_conversation(conversation_id).await?;

        let mut state = self.state.write().await;
        state.conversations.retain(|c| &c.id != conversation_id);
        if state.active.as_ref() == Some(conversation_id) {
            state.active = None;
            state.messages.clear();
            state.paginator = Paginator::new();
        }
        Ok(())
    }

    /// Upload a document into the active conversation. Offline uploads are
    /// queued for replay.
    pub async fn upload_document(&self, filename: &str, content: Vec<u8>) -> Result<()> {
        let Some(conversation_id) = self.active_conversation().await else {
            return Err(ChatError::MissingConversation(
                "select a conversation before uploading".to_string(),
            ));
        };

        if !self.engine.is_online().await {
            self.engine
                .queue_action(Action::UploadDocument {
                    conversation_id: conversation_id.clone(),
                    filename: filename.to_string(),
                    content,
                })
                .await?;
            self.notifier.notify(Notice::Info(format!(
                "'{filename}' is queued and will upload when the connection returns."
            )));
            return Ok(());
        }

        match self
            .backend
            .upload_document(&conversation_id, filename, content)
            .await
        {
            Ok(receipt) if receipt.chunks > 0 => {
                self.store
                    .upsert_document(&StoredDocument {
                        id: Uuid::new_v4(),
                        filename: receipt.filename.clone(),
                        conversation_id: conversation_id.clone(),
                        uploaded_at: chrono::Utc::now(),
                        chunks: receipt.chunks,
                    })
                    .await?;
                let snapshot = {
                    let mut state = self.state.write().await;
                    let mut message = ChatMessage::system(
                        conversation_id.clone(),
                        format!("Uploaded '{}' ({} sections indexed).", receipt.filename, receipt.chunks),
                    );
                    message.content_type = crate::types::ContentType::Document;
                    state.messages.push(message);
                    state.messages.clone()
                };
                self.store.save_messages(&conversation_id, &snapshot).await?;
                Ok(())
            }
            Ok(receipt) => {
                let err = ChatError::remote(format!(
                    "document '{}' was not ingested",
                    receipt.filename
                ));
                self.record_upload_failure(&conversation_id, filename, &err).await;
                Err(err)
            }
            Err(err) => {
                self.record_upload_failure(&conversation_id, filename, &err).await;
                Err(err)
            }
        }
    }

    async fn record_upload_failure(
        &self,
        conversation_id: &ConversationId,
        filename: &str,
        err: &ChatError,
    ) {
        warn!(filename, error = %err, "document upload failed");
        self.state.write().await.messages.push(ChatMessage::error(
            conversation_id.clone(),
            format!("Upload of '{filename}' failed: {err}"),
        ));
        self.notifier
            .notify(Notice::Error(format!("Upload of '{filename}' failed.")));
    }

    /// Persist settings locally, then push them (queued while offline).
    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        let session = self
            .session
            .session()
            .await
            .ok_or(ChatError::Unauthenticated)?;
        self.store.save_settings(&settings).await?;
        self.engine
            .queue_action(Action::UpdateSettings {
                user_id: session.user_id,
                settings,
            })
            .await
    }

    /// Persist profile changes locally, then push them (queued while
    /// offline).
    pub async fn update_user_data(&self, profile: UserProfile) -> Result<()> {
        self.store.save_user_profile(&profile).await?;
        self.engine
            .queue_action(Action::UpdateUserData { profile })
            .await
    }
}

/// A conversation title derived from its first message.
fn derive_title(content: &str) -> String {
    const MAX: usize = 40;
    let trimmed = content.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("{}…", head.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title_truncates_long_content() {
        assert_eq!(derive_title("  short question  "), "short question");

        let long = "what exactly does my policy say about pre-existing conditions?";
        let title = derive_title(long);
        assert!(title.ends_with('…'));
        assert!(title.chars().count() <= 41);
    }
}
