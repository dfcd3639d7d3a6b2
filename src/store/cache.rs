//! Typed cache operations over the durable store.
//!
//! Message, conversation, document, profile, settings, and sync-metadata
//! helpers. These keep the identifier invariant in one place: a conversation
//! id is only ever used as a storage key after passing validation, so a junk
//! id can never shadow or clobber a real cache entry.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{ChatError, Result};
use crate::ids::ConversationId;
use crate::store::{DurableStore, StoreKey};
use crate::types::{ChatMessage, Conversation, Settings, StoredDocument, UserProfile};

impl DurableStore {
    /// Replace the cached message list for a conversation.
    pub async fn save_messages(
        &self,
        conversation_id: &ConversationId,
        messages: &[ChatMessage],
    ) -> Result<()> {
        if !conversation_id.is_valid() {
            warn!(conversation_id = %conversation_id, "refusing to cache messages under invalid id");
            return Err(ChatError::InvalidId {
                raw: conversation_id.to_string(),
            });
        }
        self.save(&StoreKey::Messages(conversation_id.clone()), &messages.to_vec())
            .await
    }

    /// The cached message list for a conversation, or empty. Never fails.
    pub async fn load_messages(&self, conversation_id: &ConversationId) -> Vec<ChatMessage> {
        if !conversation_id.is_valid() {
            warn!(conversation_id = %conversation_id, "message cache lookup with invalid id");
            return Vec::new();
        }
        self.load(&StoreKey::Messages(conversation_id.clone()), Vec::new())
            .await
    }

    /// The cached conversation list, or empty.
    pub async fn load_conversations(&self) -> Vec<Conversation> {
        self.load(&StoreKey::Conversations, Vec::new()).await
    }

    /// Insert or update a conversation in the cached list. Returns the
    /// updated list.
    pub async fn upsert_conversation(&self, conversation: &Conversation) -> Result<Vec<Conversation>> {
        let mut conversations = self.load_conversations().await;
        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => conversations.push(conversation.clone()),
        }
        self.save(&StoreKey::Conversations, &conversations).await?;
        Ok(conversations)
    }

    /// Remove a conversation from the cached list, along with its message
    /// cache. Returns the updated list.
    pub async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<Conversation>> {
        let mut conversations = self.load_conversations().await;
        conversations.retain(|c| &c.id != conversation_id);
        self.save(&StoreKey::Conversations, &conversations).await?;
        if conversation_id.is_valid() {
            self.remove(&StoreKey::Messages(conversation_id.clone())).await?;
        }
        Ok(conversations)
    }

    /// The cached document records, or empty.
    pub async fn load_documents(&self) -> Vec<StoredDocument> {
        self.load(&StoreKey::Documents, Vec::new()).await
    }

    /// Insert or update a document record. Returns the updated list.
    pub async fn upsert_document(&self, document: &StoredDocument) -> Result<Vec<StoredDocument>> {
        let mut documents = self.load_documents().await;
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document.clone(),
            None => documents.push(document.clone()),
        }
        self.save(&StoreKey::Documents, &documents).await?;
        Ok(documents)
    }

    /// Remove a document record by id. Returns the updated list.
    pub async fn delete_document(&self, document_id: uuid::Uuid) -> Result<Vec<StoredDocument>> {
        let mut documents = self.load_documents().await;
        documents.retain(|d| d.id != document_id);
        self.save(&StoreKey::Documents, &documents).await?;
        Ok(documents)
    }

    /// The cached user profile, if one was saved.
    pub async fn load_user_profile(&self) -> Option<UserProfile> {
        self.load(&StoreKey::UserProfile, None).await
    }

    /// Cache the user profile.
    pub async fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.save(&StoreKey::UserProfile, &Some(profile.clone())).await
    }

    /// Client settings, falling back to defaults.
    pub async fn load_settings(&self) -> Settings {
        self.load(&StoreKey::Settings, Settings::default()).await
    }

    /// Persist client settings.
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.save(&StoreKey::Settings, settings).await
    }

    /// Timestamp of the last successful sync pass, if any.
    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.load(&StoreKey::LastSync, None).await
    }

    /// Record the time of a successful sync pass.
    pub async fn set_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.save(&StoreKey::LastSync, &Some(at)).await
    }
}
