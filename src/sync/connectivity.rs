//! Connectivity tracking.
//!
//! The host platform reports raw online/offline signals (browser events,
//! OS reachability callbacks, a heartbeat probe). [`ConnectivityMonitor`]
//! collapses them into edge transitions: repeated signals for the current
//! state are absorbed, so downstream work (queue drains, offline advisories)
//! fires exactly once per actual change.

use tracing::info;

/// Current link state as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// An observed edge between connectivity states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
}

/// Debounces raw connectivity signals into transitions.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    current: Connectivity,
}

impl ConnectivityMonitor {
    /// Start in the given state. Hosts that cannot probe at startup should
    /// assume [`Connectivity::Online`] and let the first failed request
    /// correct it.
    pub fn new(initial: Connectivity) -> Self {
        Self { current: initial }
    }

    /// The last reported state.
    pub fn current(&self) -> Connectivity {
        self.current
    }

    pub fn is_online(&self) -> bool {
        self.current == Connectivity::Online
    }

    /// Absorb a raw signal. Returns the transition if the state actually
    /// changed, `None` for a repeat of the current state.
    pub fn handle_signal(&mut self, signal: Connectivity) -> Option<Transition> {
        if signal == self.current {
            return None;
        }
        self.current = signal;
        let transition = match signal {
            Connectivity::Online => Transition::WentOnline,
            Connectivity::Offline => Transition::WentOffline,
        };
        info!(?transition, "connectivity changed");
        Some(transition)
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_signals_are_absorbed() {
        let mut monitor = ConnectivityMonitor::new(Connectivity::Online);
        assert_eq!(monitor.handle_signal(Connectivity::Online), None);
        assert_eq!(
            monitor.handle_signal(Connectivity::Offline),
            Some(Transition::WentOffline)
        );
        assert_eq!(monitor.handle_signal(Connectivity::Offline), None);
        assert_eq!(
            monitor.handle_signal(Connectivity::Online),
            Some(Transition::WentOnline)
        );
        assert!(monitor.is_online());
    }
}
