//! ConnectivityMonitor - the online/offline signal.
//!
//! An injectable instance, not a process-wide singleton, so tests can build
//! independent monitors. The underlying platform signal is the host's
//! concern; a host that cannot read its signal constructs the monitor
//! offline ("assume offline") and corrects it later.

use tokio::sync::watch;

/// Current connectivity state with exactly-once transition notification.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial assumption.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Create a monitor that assumes offline until told otherwise.
    pub fn assume_offline() -> Self {
        Self::new(false)
    }

    /// Current state.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record a connectivity change.
    ///
    /// Subscribers are notified exactly once per transition: setting the
    /// value that is already current publishes nothing.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }

    /// Subscribe to transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::assume_offline()
    }
}
