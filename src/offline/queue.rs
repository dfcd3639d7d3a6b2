//! # Offline Action Queue
//!
//! Ordered, locally-durable queue of remote operations composed while the
//! network is unavailable. Actions survive process restart and are replayed
//! in enqueue order when connectivity returns.
//!
//! ## Semantics
//!
//! - **FIFO drain**: one drain pass attempts every queued action exactly
//!   once, in enqueue order.
//! - **Partial failure**: one action's failure never blocks the rest of the
//!   pass. Failures record the error and stay queued; successes are purged
//!   permanently (no completed-action history).
//! - **Validation at the boundary**: an action carrying a syntactically
//!   invalid conversation id is rejected at enqueue time — unusable work is
//!   never persisted.
//! - **Fresh reads**: a drain always re-loads the persisted queue rather
//!   than reusing a snapshot captured before an await point, so an enqueue
//!   racing a drain in the same tick is never overwritten.
//!
//! The queue is persisted as raw JSON items and each item is decoded
//! individually at drain time: an unrecognizable entry (unknown action type,
//! malformed payload) is a permanent per-action failure that stays in the
//! queue without disturbing the pass.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ChatError, Result};
use crate::ids::ConversationId;
use crate::store::{DurableStore, StoreKey};
use crate::types::{Settings, UserProfile};

/// A remote operation that can be deferred while offline.
///
/// Tagged-variant encoding matches the persisted `{type, data}` layout, so
/// cached queues keep decoding across versions that add variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Action {
    #[serde(rename = "CREATE_CONVERSATION")]
    CreateConversation { user_id: String, title: String },
    #[serde(rename = "SEND_MESSAGE")]
    SendMessage {
        conversation_id: ConversationId,
        user_id: String,
        content: String,
    },
    #[serde(rename = "UPLOAD_DOCUMENT")]
    UploadDocument {
        conversation_id: ConversationId,
        filename: String,
        content: Vec<u8>,
    },
    #[serde(rename = "UPDATE_SETTINGS")]
    UpdateSettings { user_id: String, settings: Settings },
    #[serde(rename = "UPDATE_USER_DATA")]
    UpdateUserData { profile: UserProfile },
}

impl Action {
    /// The conversation id carried by this action, when applicable.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Action::SendMessage { conversation_id, .. }
            | Action::UploadDocument { conversation_id, .. } => Some(conversation_id),
            Action::CreateConversation { .. }
            | Action::UpdateSettings { .. }
            | Action::UpdateUserData { .. } => None,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateConversation { .. } => "create_conversation",
            Action::SendMessage { .. } => "send_message",
            Action::UploadDocument { .. } => "upload_document",
            Action::UpdateSettings { .. } => "update_settings",
            Action::UpdateUserData { .. } => "update_user_data",
        }
    }
}

/// Execution status of a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
}

/// An action with its queue metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    #[serde(flatten)]
    pub action: Action,
    pub enqueued_at: DateTime<Utc>,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default)]
pub struct DrainOutcome {
    /// Actions whose executor call succeeded (purged from the queue).
    pub processed: Vec<QueuedAction>,
    /// Actions whose executor call failed (retained for the next pass).
    pub failed: Vec<QueuedAction>,
    /// Persisted entries that no longer decode; retained but undecodable.
    pub malformed: usize,
}

impl DrainOutcome {
    /// Count of actions still pending after the pass.
    pub fn pending(&self) -> usize {
        self.failed.len() + self.malformed
    }
}

/// The persisted offline action queue.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    store: Arc<DurableStore>,
}

impl OfflineQueue {
    pub fn new(store: Arc<DurableStore>) -> Self {
        Self { store }
    }

    /// Validate, normalize, and append an action to the persisted queue.
    /// Returns the updated queue. Actions with an invalid conversation id
    /// are rejected (logged, queue unchanged).
    pub async fn enqueue(&self, action: Action) -> Result<Vec<QueuedAction>> {
        if let Some(id) = action.conversation_id() {
            if !id.is_valid() {
                warn!(kind = action.kind(), conversation_id = %id, "rejecting action with invalid conversation id");
                return Err(ChatError::InvalidId {
                    raw: id.to_string(),
                });
            }
        }

        let queued = QueuedAction {
            action,
            enqueued_at: Utc::now(),
            status: ActionStatus::Pending,
            last_error: None,
        };

        let mut raw = self.load_raw().await;
        raw.push(serde_json::to_value(&queued)?);
        self.store.save(&StoreKey::OfflineQueue, &raw).await?;
        info!(kind = queued.action.kind(), queued = raw.len(), "action queued for offline sync");

        Ok(self.decode(&raw))
    }

    /// Number of entries currently persisted (including undecodable ones).
    pub async fn len(&self) -> usize {
        self.load_raw().await.len()
    }

    /// Whether the persisted queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The decodable queued actions, in enqueue order.
    pub async fn pending(&self) -> Vec<QueuedAction> {
        let raw = self.load_raw().await;
        self.decode(&raw)
    }

    /// Drain the queue: attempt every action once, in enqueue order, each
    /// independently. After the pass the persisted queue holds exactly the
    /// failed subset (plus any undecodable entries); completed actions are
    /// purged permanently.
    pub async fn drain<F, Fut>(&self, mut executor: F) -> Result<DrainOutcome>
    where
        F: FnMut(Action) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        // Always operate on a fresh load, never a stale snapshot.
        let raw = self.load_raw().await;

        let mut outcome = DrainOutcome::default();
        let mut retained: Vec<serde_json::Value> = Vec::new();

        for entry in raw {
            let mut item: QueuedAction = match serde_json::from_value(entry.clone()) {
                Ok(item) => item,
                Err(err) => {
                    warn!(error = %err, "undecodable queue entry retained as failed");
                    outcome.malformed += 1;
                    retained.push(entry);
                    continue;
                }
            };

            // Persisted data is untrusted; re-check the id invariant.
            if let Some(id) = item.action.conversation_id() {
                if !id.is_valid() {
                    item.status = ActionStatus::Failed;
                    item.last_error = Some(format!("invalid conversation id: {id}"));
                    retained.push(serde_json::to_value(&item)?);
                    outcome.failed.push(item);
                    continue;
                }
            }

            match executor(item.action.clone()).await {
                Ok(()) => {
                    item.status = ActionStatus::Completed;
                    outcome.processed.push(item);
                }
                Err(err) => {
                    warn!(kind = item.action.kind(), error = %err, "queued action failed, retained for retry");
                    item.status = ActionStatus::Failed;
                    item.last_error = Some(err.to_string());
                    retained.push(serde_json::to_value(&item)?);
                    outcome.failed.push(item);
                }
            }
        }

        self.store.save(&StoreKey::OfflineQueue, &retained).await?;
        info!(
            processed = outcome.processed.len(),
            failed = outcome.failed.len(),
            malformed = outcome.malformed,
            "drain pass complete"
        );
        Ok(outcome)
    }

    async fn load_raw(&self) -> Vec<serde_json::Value> {
        self.store.load(&StoreKey::OfflineQueue, Vec::new()).await
    }

    fn decode(&self, raw: &[serde_json::Value]) -> Vec<QueuedAction> {
        raw.iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect()
    }
}
