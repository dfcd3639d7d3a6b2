//! Remote backend abstraction.
//!
//! The sync engine and view model talk to the server exclusively through
//! [`RemoteBackend`], so connectivity handling and replay logic are testable
//! against scripted implementations. The production HTTP implementation is
//! [`http::HttpBackend`].

pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;

use crate::auth::Session;
use crate::error::Result;
use crate::ids::ConversationId;
use crate::types::{ChatMessage, Conversation, Settings, UserProfile};

/// What the backend reports after ingesting an uploaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReceipt {
    /// Extracted text preview, when the backend returns one.
    pub text: Option<String>,
    /// Filename as stored server-side.
    pub filename: String,
    /// Number of retrieval chunks stored. Zero means ingestion failed.
    pub chunks: u32,
}

/// The remote conversation service.
///
/// Every method is a single round trip; callers own retry and offline
/// queueing. Implementations map transport and contract failures to
/// [`crate::error::ChatError::Remote`].
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Submit the conversation history and get the AI answer for the final
    /// user turn.
    async fn ask(
        &self,
        user_id: &str,
        conversation_id: &ConversationId,
        history: &[ChatMessage],
    ) -> Result<String>;

    /// Upload a document for retrieval-augmented answering.
    async fn upload_document(
        &self,
        conversation_id: &ConversationId,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<DocumentReceipt>;

    /// All conversations owned by the user, newest first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Create a conversation and return it with its server-assigned id.
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation>;

    /// Rename an existing conversation.
    async fn rename_conversation(&self, conversation_id: &ConversationId, title: &str)
        -> Result<()>;

    /// Delete a conversation. Requires an authenticated session.
    async fn delete_conversation(
        &self,
        conversation_id: &ConversationId,
        session: &Session,
    ) -> Result<()>;

    /// One page of history, oldest first within the page.
    async fn fetch_messages_page(
        &self,
        conversation_id: &ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChatMessage>>;

    /// Persist one message and return the server-confirmed record (with the
    /// server-assigned message id).
    async fn append_message(&self, message: &ChatMessage) -> Result<ChatMessage>;

    /// Push the user's client settings.
    async fn update_settings(&self, user_id: &str, settings: &Settings) -> Result<()>;

    /// Push profile changes.
    async fn update_user_data(&self, profile: &UserProfile) -> Result<()>;
}
