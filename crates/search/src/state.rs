//! Change notification shared by the search subsystems

use std::sync::Arc;
use tokio::sync::watch;

/// Monotonic revision counter, bumped whenever any displayed state changes.
///
/// UI bindings subscribe and re-read the coordinator state on change.
#[derive(Clone)]
pub struct Revision(Arc<watch::Sender<u64>>);

impl Revision {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self(Arc::new(tx))
    }

    pub fn bump(&self) {
        self.0.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    pub fn current(&self) -> u64 {
        *self.0.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.subscribe()
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::new()
    }
}
