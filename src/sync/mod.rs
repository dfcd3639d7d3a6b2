//! Synchronization: connectivity tracking, sync status, and offline replay.

pub mod connectivity;
pub mod engine;
pub mod state;

pub use connectivity::{Connectivity, ConnectivityMonitor, Transition};
pub use engine::SyncEngine;
pub use state::SyncStatus;
