//! Usage tracker
//!
//! Best-effort snapshot of the account quota. The search path consults it
//! for the low-quota confirmation but never waits on it or fails because of it.

use std::sync::Arc;

use industrydb_common::{Result, UsageInfo};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::LeadsApi;
use crate::state::Revision;

pub struct UsageTracker<A: LeadsApi> {
    api: Arc<A>,
    threshold: u64,
    snapshot: Arc<Mutex<Option<UsageInfo>>>,
    revision: Revision,
}

impl<A: LeadsApi> Clone for UsageTracker<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            threshold: self.threshold,
            snapshot: self.snapshot.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<A: LeadsApi> UsageTracker<A> {
    pub fn new(api: Arc<A>, threshold: u64, revision: Revision) -> Self {
        Self {
            api,
            threshold,
            snapshot: Arc::new(Mutex::new(None)),
            revision,
        }
    }

    /// Fetch the quota and replace the local snapshot
    pub async fn refresh(&self) -> Result<UsageInfo> {
        let usage = self.api.usage().await?;
        debug!(remaining = usage.remaining, limit = usage.limit, "Usage refreshed");
        *self.snapshot.lock() = Some(usage.clone());
        self.revision.bump();
        Ok(usage)
    }

    /// [`refresh`](Self::refresh), logging failures instead of returning them
    pub async fn refresh_logged(&self) -> Option<UsageInfo> {
        match self.refresh().await {
            Ok(usage) => Some(usage),
            Err(e) => {
                warn!("Failed to refresh usage: {}", e);
                None
            }
        }
    }

    pub fn snapshot(&self) -> Option<UsageInfo> {
        self.snapshot.lock().clone()
    }

    /// Remaining quota is in `(0, threshold]`
    pub fn is_low(&self) -> bool {
        self.snapshot
            .lock()
            .as_ref()
            .map_or(false, |usage| usage.is_low(self.threshold))
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedApi;

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let api = ScriptedApi::with_usage(50);
        let tracker = UsageTracker::new(api.clone(), 10, Revision::new());
        assert!(tracker.snapshot().is_none());

        tracker.refresh().await.unwrap();
        assert_eq!(tracker.snapshot().unwrap().remaining, 50);
        assert!(!tracker.is_low());

        api.set_usage(4);
        tracker.refresh().await.unwrap();
        assert!(tracker.is_low());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let api = ScriptedApi::with_usage(8);
        let tracker = UsageTracker::new(api.clone(), 10, Revision::new());
        tracker.refresh().await.unwrap();

        let broken = ScriptedApi::new();
        let other = UsageTracker {
            api: broken,
            ..tracker.clone()
        };
        assert!(other.refresh_logged().await.is_none());
        assert_eq!(tracker.snapshot().unwrap().remaining, 8);
    }

    #[tokio::test]
    async fn test_exhausted_is_not_low() {
        let api = ScriptedApi::with_usage(0);
        let tracker = UsageTracker::new(api, 10, Revision::new());
        tracker.refresh().await.unwrap();
        assert!(!tracker.is_low());
    }
}
