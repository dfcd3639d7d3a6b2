//! User-visible advisories.
//!
//! Component-local failures are converted to notices instead of propagating:
//! going offline, partial sync failures, stale cached data, entitlement
//! blocks. The surface that displays them (toast, banner, status bar) is an
//! external collaborator behind the [`Notifier`] trait, injected into the
//! sync engine and view model.

use std::sync::{Mutex, PoisonError};

use tracing::{error, info, warn};

/// A user-visible advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

impl Notice {
    /// The advisory text, regardless of severity.
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}

/// Sink for user-visible advisories.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that forwards advisories to the tracing log. The default when a
/// host application has no notification surface wired up yet.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Info(m) => info!("{m}"),
            Notice::Warning(m) => warn!("{m}"),
            Notice::Error(m) => error!("{m}"),
        }
    }
}

/// Notifier that collects advisories in memory. Used by tests and by hosts
/// that poll for notices once per frame.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far, in order. A panic on another thread
    /// while the lock was held does not lose the notice list.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain recorded notices.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notice::Info("a".into()));
        notifier.notify(Notice::Warning("b".into()));

        let notices = notifier.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].message(), "a");
        assert_eq!(notices[1], Notice::Warning("b".into()));

        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn test_poisoned_notifier_keeps_working() {
        let notifier = std::sync::Arc::new(MemoryNotifier::new());
        notifier.notify(Notice::Info("before".into()));

        let poisoner = notifier.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.notices.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        notifier.notify(Notice::Info("after".into()));
        let notices = notifier.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].message(), "after");
    }
}
