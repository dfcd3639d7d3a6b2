//! PolicyChat Core - Offline-Resilient Conversation State
//!
//! PolicyChat is a chat client for a policy-explanation assistant: users
//! upload policy documents, ask questions in natural language, and receive
//! AI answers anchored to the uploaded content. This crate is the client's
//! core: the message-synchronization and conversation-state layer that keeps
//! working when the network does not.
//!
//! # Overview
//!
//! The core provides:
//! - A durable local store (SQLite) that survives process restart
//! - An ordered offline action queue with FIFO drain and partial-failure
//!   retention
//! - Connectivity tracking with edge-triggered queue replay
//! - A conversation view model with optimistic sends, server reconciliation,
//!   and cached-history fallback
//! - Scroll-back pagination of large message histories
//!
//! # Module Structure
//!
//! - **`store`** - Durable key-value store plus typed cache helpers
//! - **`offline`** - The persisted action queue and its drain semantics
//! - **`sync`** - Connectivity monitor, sync status, and the replay engine
//! - **`chat`** - Conversation view model and pagination controller
//! - **`remote`** - The backend trait and its HTTP implementation
//! - **`ids`**, **`types`** - Canonical identifiers and the data model
//! - **`auth`**, **`notify`**, **`config`**, **`error`** - Session handle,
//!   user-visible advisories, endpoint configuration, error taxonomy
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use policychat::auth::StaticSessionProvider;
//! use policychat::chat::ConversationViewModel;
//! use policychat::config::Config;
//! use policychat::notify::LogNotifier;
//! use policychat::remote::HttpBackend;
//! use policychat::store::DurableStore;
//! use policychat::sync::{Connectivity, SyncEngine};
//!
//! # async fn example() -> policychat::error::Result<()> {
//! let store = Arc::new(DurableStore::open().await?);
//! let backend = Arc::new(HttpBackend::new(Config::new()));
//! let notifier = Arc::new(LogNotifier);
//! let engine = Arc::new(SyncEngine::new(
//!     backend.clone(),
//!     store.clone(),
//!     notifier.clone(),
//!     Connectivity::Online,
//! ));
//! let session = Arc::new(StaticSessionProvider::signed_in("user-1", "token"));
//! let chat = ConversationViewModel::new(backend, store, engine, session, notifier);
//!
//! chat.load_conversations().await;
//! chat.send_message("What does my policy cover?").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Nothing here is fatal to the process: loads degrade to cached or default
//! values, failed sends stay visible with an error flag, and failed queued
//! actions wait for the next drain pass. See [`error`] for the taxonomy.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod ids;
pub mod notify;
pub mod offline;
pub mod remote;
pub mod store;
pub mod sync;
pub mod types;

pub use chat::{ConversationViewModel, Paginator, PAGE_SIZE};
pub use error::{ChatError, Result};
pub use ids::ConversationId;
pub use offline::{Action, OfflineQueue};
pub use store::DurableStore;
pub use sync::{Connectivity, SyncEngine, SyncStatus};
pub use types::{ChatMessage, Conversation, MessageSender};
