//! # Error Types
//!
//! Defines the error taxonomy for the policychat core.
//!
//! Errors fall into a few well-separated classes:
//!
//! - **Validation** (`InvalidId`, `EmptyMessage`, `MissingConversation`) —
//!   rejected before any I/O, surfaced inline, never enqueued or sent.
//! - **Transient remote** (`Remote`) — network failures, non-2xx responses,
//!   undecodable response bodies. Sends are retained visibly with an error
//!   flag; queued actions are retained for the next drain.
//! - **Entitlement** (`Entitlement`) — free-tier limits hit before any
//!   mutation or network call.
//! - **Local store** (`Store`, `Serialization`) — persistence failures.
//!   Corrupt cached values never surface here; loads degrade to defaults.
//!
//! Nothing in this crate treats an error as fatal to the process: the worst
//! outcome is a visible error state plus a retry opportunity.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;

/// All errors the policychat core can produce.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A conversation identifier failed the canonical grammar check.
    #[error("invalid conversation id: {raw}")]
    InvalidId {
        /// The offending identifier, as received.
        raw: String,
    },

    /// A message send was attempted with no content.
    #[error("message content is empty")]
    EmptyMessage,

    /// An operation required an active conversation and none was selected
    /// (or one could not be created in the current connectivity state).
    #[error("no conversation available: {0}")]
    MissingConversation(String),

    /// The user is not signed in.
    #[error("not signed in")]
    Unauthenticated,

    /// A remote call failed: network error, non-2xx status, or a response
    /// body that did not match the contract.
    #[error("remote error: {0}")]
    Remote(String),

    /// A free-tier limit blocked the operation pre-flight.
    #[error("free tier limit reached: {0}")]
    Entitlement(String),

    /// The local durable store failed at the SQLite level.
    #[error("local store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A value could not be serialized for storage or transmission.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// Create a remote error from anything displayable.
    pub fn remote(message: impl std::fmt::Display) -> Self {
        ChatError::Remote(message.to_string())
    }

    /// Whether this error class should be retried on the next drain pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Remote(_) | ChatError::Store(_))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Remote(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_constructor() {
        let err = ChatError::remote("connection refused");
        assert!(matches!(err, ChatError::Remote(_)));
        assert_eq!(err.to_string(), "remote error: connection refused");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ChatError::remote("boom").is_transient());
        assert!(!ChatError::EmptyMessage.is_transient());
        assert!(!ChatError::Entitlement("limit".into()).is_transient());
    }
}
