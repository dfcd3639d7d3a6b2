//! Sync progress snapshot.
//!
//! A cheap, cloneable status record the host UI can poll every frame to
//! render a sync indicator (spinner, pending-action badge, last-synced time).

use chrono::{DateTime, Utc};

/// Current synchronization status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    /// Actions waiting in the offline queue (including undecodable entries).
    pub pending_actions: usize,
    /// Whether a drain pass is currently running.
    pub is_syncing: bool,
    /// Completion time of the most recent successful drain pass.
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncStatus {
    /// Whether there is nothing left to replay.
    pub fn is_drained(&self) -> bool {
        self.pending_actions == 0 && !self.is_syncing
    }
}
