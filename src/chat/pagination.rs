//! Message history pagination.
//!
//! Older history is fetched in fixed-size pages as the user scrolls back.
//! [`Paginator`] guards against the two classic faults: overlapping loads
//! (a second request started while one is in flight) and phantom pages
//! (requests issued after the history is exhausted).
//!
//! A short page — fewer rows than [`PAGE_SIZE`] — already proves exhaustion;
//! the paginator stops without needing a trailing empty page.

use tracing::debug;

use crate::error::Result;
use crate::ids::ConversationId;
use crate::remote::RemoteBackend;
use crate::types::ChatMessage;

/// Number of messages fetched per page.
pub const PAGE_SIZE: usize = 20;

/// Scroll-back pagination state for one conversation's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    has_more: bool,
    is_loading_more: bool,
}

impl Paginator {
    /// Fresh paginator: nothing loaded yet, first page pending.
    pub fn new() -> Self {
        Self {
            page: 0,
            has_more: true,
            is_loading_more: false,
        }
    }

    /// Paginator positioned after the initial history fetch of `fetched`
    /// messages (the newest page, loaded with the conversation).
    pub fn after_initial_load(fetched: usize) -> Self {
        Self {
            page: 1,
            has_more: fetched >= PAGE_SIZE,
            is_loading_more: false,
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    /// Pages fetched so far.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Start a page load. Returns the offset to fetch at, or `None` when a
    /// load is already in flight or the history is exhausted.
    pub fn begin_load(&mut self) -> Option<usize> {
        if self.is_loading_more || !self.has_more {
            debug!(
                in_flight = self.is_loading_more,
                has_more = self.has_more,
                "page load suppressed"
            );
            return None;
        }
        self.is_loading_more = true;
        Some(self.page * PAGE_SIZE)
    }

    /// Record a completed page of `fetched` messages. A short page marks the
    /// history exhausted.
    pub fn complete_load(&mut self, fetched: usize) {
        self.page += 1;
        self.has_more = fetched >= PAGE_SIZE;
        self.is_loading_more = false;
    }

    /// Record a failed page load. The page is not consumed, so the next
    /// `begin_load` retries the same offset.
    pub fn abort_load(&mut self) {
        self.is_loading_more = false;
    }

    /// Fetch the next page of history through `backend`. Returns an empty
    /// vec (without a network call) when exhausted or already loading.
    pub async fn load_more(
        &mut self,
        backend: &dyn RemoteBackend,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatMessage>> {
        let Some(offset) = self.begin_load() else {
            return Ok(Vec::new());
        };
        match backend
            .fetch_messages_page(conversation_id, offset, PAGE_SIZE)
            .await
        {
            Ok(page) => {
                self.complete_load(page.len());
                Ok(page)
            }
            Err(err) => {
                self.abort_load();
                Err(err)
            }
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}
