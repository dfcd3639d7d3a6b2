//! # Sync Engine
//!
//! Replays the offline action queue against the remote backend when
//! connectivity returns, and keeps the durable caches consistent with what
//! the server confirmed.
//!
//! ## Behavior
//!
//! - **Edge-triggered**: a drain pass runs on the offline-to-online
//!   transition and after each enqueue while online, never on repeated
//!   online signals.
//! - **At-most-once per pass**: each queued action is attempted once per
//!   pass; failures stay queued for the next pass and are reported as one
//!   aggregate advisory, not one per action.
//! - **Offline is not an error**: a pass requested while offline is a no-op.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::ids::ConversationId;
use crate::notify::{Notice, Notifier};
use crate::offline::{Action, DrainOutcome, OfflineQueue};
use crate::remote::RemoteBackend;
use crate::store::DurableStore;
use crate::sync::connectivity::{Connectivity, ConnectivityMonitor, Transition};
use crate::sync::state::SyncStatus;
use crate::types::{ChatMessage, DeliveryState, MessageSender, StoredDocument};

/// Orchestrates offline replay and connectivity handling.
pub struct SyncEngine {
    backend: Arc<dyn RemoteBackend>,
    store: Arc<DurableStore>,
    queue: OfflineQueue,
    notifier: Arc<dyn Notifier>,
    monitor: RwLock<ConnectivityMonitor>,
    status: RwLock<SyncStatus>,
}

impl SyncEngine {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        store: Arc<DurableStore>,
        notifier: Arc<dyn Notifier>,
        initial: Connectivity,
    ) -> Self {
        Self {
            backend,
            store: store.clone(),
            queue: OfflineQueue::new(store),
            notifier,
            monitor: RwLock::new(ConnectivityMonitor::new(initial)),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    /// The offline queue backing this engine.
    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub async fn is_online(&self) -> bool {
        self.monitor.read().await.is_online()
    }

    /// Current sync status snapshot.
    pub async fn status(&self) -> SyncStatus {
        let mut status = self.status.read().await.clone();
        if status.last_sync.is_none() {
            status.last_sync = self.store.last_sync().await;
        }
        status
    }

    /// Feed a raw connectivity signal from the host platform. Going online
    /// triggers one drain pass; going offline posts an advisory. Repeats of
    /// the current state do nothing.
    pub async fn handle_connectivity(&self, signal: Connectivity) -> Result<()> {
        let transition = self.monitor.write().await.handle_signal(signal);
        match transition {
            Some(Transition::WentOnline) => {
                info!("back online, draining offline queue");
                self.sync_offline_data().await?;
            }
            Some(Transition::WentOffline) => {
                self.notifier.notify(Notice::Warning(
                    "You are offline. Changes will be queued and sent when the connection returns."
                        .to_string(),
                ));
                self.refresh_pending_count().await;
            }
            None => debug!(?signal, "connectivity signal repeated, ignoring"),
        }
        Ok(())
    }

    /// Run one drain pass over the offline queue. No-op while offline.
    pub async fn sync_offline_data(&self) -> Result<DrainOutcome> {
        if !self.is_online().await {
            debug!("sync requested while offline, skipping");
            return Ok(DrainOutcome::default());
        }

        {
            let mut status = self.status.write().await;
            if status.is_syncing {
                debug!("drain pass already running, skipping");
                return Ok(DrainOutcome::default());
            }
            status.is_syncing = true;
        }

        let result = self.queue.drain(|action| self.execute(action)).await;

        let mut status = self.status.write().await;
        status.is_syncing = false;
        match result {
            Ok(outcome) => {
                // Every completed pass stamps last_sync, failures included;
                // pending_actions carries what remains.
                status.pending_actions = outcome.pending();
                let now = Utc::now();
                status.last_sync = Some(now);
                if let Err(err) = self.store.set_last_sync(now).await {
                    warn!(error = %err, "could not persist sync timestamp");
                }
                if outcome.pending() > 0 {
                    self.notifier.notify(Notice::Warning(format!(
                        "{} queued change(s) could not be synced and will be retried.",
                        outcome.pending()
                    )));
                }
                Ok(outcome)
            }
            Err(err) => Err(err),
        }
    }

    /// Queue an action, then drain immediately when online. While offline
    /// the action simply waits for the next online transition.
    pub async fn queue_action(&self, action: Action) -> Result<()> {
        self.queue.enqueue(action).await?;
        if self.is_online().await {
            self.sync_offline_data().await?;
        } else {
            self.refresh_pending_count().await;
        }
        Ok(())
    }

    async fn refresh_pending_count(&self) {
        let pending = self.queue.len().await;
        self.status.write().await.pending_actions = pending;
    }

    /// Execute one queued action against the backend, updating the durable
    /// caches with whatever the server confirmed.
    async fn execute(&self, action: Action) -> Result<()> {
        match action {
            Action::CreateConversation { user_id, title } => {
                let conversation = self.backend.create_conversation(&user_id, &title).await?;
                self.store.upsert_conversation(&conversation).await?;
                Ok(())
            }
            Action::SendMessage {
                conversation_id,
                user_id,
                content,
            } => {
                self.replay_send(&conversation_id, &user_id, &content).await
            }
            Action::UploadDocument {
                conversation_id,
                filename,
                content,
            } => {
                let receipt = self
                    .backend
                    .upload_document(&conversation_id, &filename, content)
                    .await?;
                if receipt.chunks == 0 {
                    return Err(ChatError::remote(format!(
                        "document '{filename}' was not ingested"
                    )));
                }
                self.store
                    .upsert_document(&StoredDocument {
                        id: uuid::Uuid::new_v4(),
                        filename: receipt.filename,
                        conversation_id,
                        uploaded_at: Utc::now(),
                        chunks: receipt.chunks,
                    })
                    .await?;
                Ok(())
            }
            Action::UpdateSettings { user_id, settings } => {
                self.backend.update_settings(&user_id, &settings).await?;
                self.store.save_settings(&settings).await?;
                Ok(())
            }
            Action::UpdateUserData { profile } => {
                self.backend.update_user_data(&profile).await?;
                self.store.save_user_profile(&profile).await?;
                Ok(())
            }
        }
    }

    /// Replay an offline-composed message: persist it, run the AI turn, and
    /// reconcile the optimistic cache entry with the server-confirmed record.
    /// The confirmed swap is cached before the AI turn, so a retry after a
    /// failed answer never appends the user turn to the server twice.
    async fn replay_send(
        &self,
        conversation_id: &ConversationId,
        user_id: &str,
        content: &str,
    ) -> Result<()> {
        let mut messages = self.store.load_messages(conversation_id).await;

        // Locate the entry for this send: the optimistic pending one first,
        // then one already confirmed by an earlier pass whose AI turn failed.
        // A cache wiped between enqueue and replay just means we rebuild it.
        let pending_idx = messages
            .iter()
            .position(|m| m.delivery == DeliveryState::LocalPending && m.content == content);
        let confirmed_idx = messages.iter().position(|m| {
            m.sender == MessageSender::User
                && m.delivery == DeliveryState::Confirmed
                && m.content == content
        });
        let index = match pending_idx.or(confirmed_idx) {
            Some(idx) => idx,
            None => {
                messages.push(ChatMessage::user(conversation_id.clone(), content));
                messages.len() - 1
            }
        };

        if messages[index].delivery != DeliveryState::Confirmed {
            let confirmed = self.backend.append_message(&messages[index]).await?;
            // Swap in place so the visible ordering never changes, and cache
            // immediately: the AI turn below can still fail, and its retry
            // must find the user turn already confirmed.
            messages[index] = ChatMessage {
                delivery: DeliveryState::Confirmed,
                ..confirmed
            };
            self.store.save_messages(conversation_id, &messages).await?;
        }

        let answer = self
            .backend
            .ask(user_id, conversation_id, &messages)
            .await?;

        messages.push(ChatMessage::ai(conversation_id.clone(), answer));
        self.store.save_messages(conversation_id, &messages).await?;
        Ok(())
    }
}
