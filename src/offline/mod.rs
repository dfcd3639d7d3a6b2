//! Offline support: the durable action queue.
//!
//! Actions composed while disconnected are persisted here and replayed by the
//! sync engine when connectivity returns. See [`queue`] for the drain
//! semantics.

pub mod queue;

pub use queue::{Action, ActionStatus, DrainOutcome, OfflineQueue, QueuedAction};
