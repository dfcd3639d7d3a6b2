//! Session and identity handle.
//!
//! The core treats the identity provider as an external collaborator: all it
//! needs is the current session (opaque user id plus the access token used
//! for authorized remote calls). Auth protocol internals live elsewhere.
//!
//! Implementations are injected into the view model and sync engine rather
//! than read from ambient global state, which keeps tests deterministic.

use async_trait::async_trait;

/// An authenticated session handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque identifier of the signed-in user.
    pub user_id: String,
    /// Token presented on authorized remote calls (conversation delete).
    pub access_token: String,
}

/// Supplies the current session, if any.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, or `None` when signed out.
    async fn session(&self) -> Option<Session>;
}

/// A fixed session, useful for tests and single-user embedding.
#[derive(Debug, Clone)]
pub struct StaticSessionProvider {
    session: Option<Session>,
}

impl StaticSessionProvider {
    pub fn signed_in(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            session: Some(Session {
                user_id: user_id.into(),
                access_token: access_token.into(),
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self { session: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn session(&self) -> Option<Session> {
        self.session.clone()
    }
}
