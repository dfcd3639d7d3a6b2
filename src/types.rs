//! Core data model.
//!
//! Shared types for conversations, messages, the user profile, settings, and
//! cached document records. All timestamps are UTC; all identifiers are
//! canonical strings (see [`crate::ids`]), so serialized values compare
//! directly after a reload.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::ConversationId;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    User,
    Ai,
    System,
}

/// What kind of content a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Document,
    Error,
}

/// Reconciliation state of a message relative to the remote store.
///
/// Every message is exactly one of: optimistically inserted and awaiting
/// confirmation, confirmed by the server, or failed (retained visibly, not
/// retried automatically).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    LocalPending,
    Confirmed,
    Failed,
}

impl Default for DeliveryState {
    fn default() -> Self {
        DeliveryState::Confirmed
    }
}

/// A single chat message.
///
/// `id` is a client-generated temporary UUID until the server confirms the
/// write, at which point it is replaced in place by the server-assigned id.
/// `conversation_id` may hold the placeholder until the owning conversation
/// is created; the view model rewrites all placeholder-tagged messages
/// atomically on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender: MessageSender,
    pub content: String,
    pub content_type: ContentType,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    /// Set when the AI turn (or the remote write) for this message failed.
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub delivery: DeliveryState,
}

impl ChatMessage {
    /// A locally composed user message awaiting confirmation.
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender: MessageSender::User,
            content: content.into(),
            content_type: ContentType::Text,
            created_at: Utc::now(),
            context: None,
            metadata: None,
            error: false,
            delivery: DeliveryState::LocalPending,
        }
    }

    /// A server-confirmed AI answer.
    pub fn ai(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender: MessageSender::Ai,
            content: content.into(),
            content_type: ContentType::Text,
            created_at: Utc::now(),
            context: None,
            metadata: None,
            error: false,
            delivery: DeliveryState::Confirmed,
        }
    }

    /// A locally synthesized advisory shown inside the conversation.
    pub fn system(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender: MessageSender::System,
            content: content.into(),
            content_type: ContentType::Text,
            created_at: Utc::now(),
            context: None,
            metadata: None,
            error: false,
            delivery: DeliveryState::Confirmed,
        }
    }

    /// A conversation-visible error entry (failed AI turn, failed upload).
    pub fn error(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Error,
            error: true,
            ..Self::system(conversation_id, content)
        }
    }
}

/// A conversation owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            created_at: now,
            updated_at: now,
            summary: None,
            metadata: HashMap::new(),
        }
    }
}

/// The user profile as cached locally.
///
/// Premium membership is a window: `membership_status` must be `"premium"`
/// and the current time must fall between the start and end dates when they
/// are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub membership_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_end_date: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Whether the profile grants premium entitlements at `now`.
    pub fn is_premium_at(&self, now: DateTime<Utc>) -> bool {
        if self.membership_status != "premium" {
            return false;
        }
        if let Some(start) = self.premium_start_date {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.premium_end_date {
            if now > end {
                return false;
            }
        }
        true
    }

    /// Whether the profile grants premium entitlements right now.
    pub fn is_premium(&self) -> bool {
        self.is_premium_at(Utc::now())
    }
}

/// Client settings persisted locally and synchronized when online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: String,
    pub notifications: bool,
    pub auto_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications: true,
            auto_save: true,
        }
    }
}

/// A locally cached record of an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub filename: String,
    pub conversation_id: ConversationId,
    pub uploaded_at: DateTime<Utc>,
    /// Number of text chunks the backend stored for retrieval.
    pub chunks: u32,
}
