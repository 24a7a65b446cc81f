//! Preview coordinator
//!
//! Keeps a live result-count estimate in sync with filter edits:
//! - every edit restarts a single-slot debounce timer
//! - filters without any meaningful criterion are never fetched
//! - a response is only shown if no edit happened since it was scheduled

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use industrydb_common::{PreviewResult, SearchFilters};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::LeadsApi;
use crate::state::Revision;

/// What the preview area shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreviewState {
    /// Nothing to preview
    Idle,
    /// Waiting for the quiet period or the response
    Pending,
    Ready(PreviewResult),
    Failed { message: String },
}

impl PreviewState {
    pub fn result(&self) -> Option<&PreviewResult> {
        match self {
            PreviewState::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn estimated_count(&self) -> Option<u64> {
        self.result().map(|r| r.estimated_count)
    }
}

struct PreviewInner {
    generation: u64,
    state: PreviewState,
    task: Option<JoinHandle<()>>,
}

pub struct PreviewCoordinator<A: LeadsApi> {
    api: Arc<A>,
    debounce: Duration,
    inner: Arc<Mutex<PreviewInner>>,
    revision: Revision,
}

impl<A: LeadsApi> Clone for PreviewCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            debounce: self.debounce,
            inner: self.inner.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<A: LeadsApi> PreviewCoordinator<A> {
    pub fn new(api: Arc<A>, debounce: Duration, revision: Revision) -> Self {
        Self {
            api,
            debounce,
            inner: Arc::new(Mutex::new(PreviewInner {
                generation: 0,
                state: PreviewState::Idle,
                task: None,
            })),
            revision,
        }
    }

    pub fn state(&self) -> PreviewState {
        self.inner.lock().state.clone()
    }

    /// React to a filter change. Must be called from within a Tokio runtime.
    pub fn schedule(&self, filters: SearchFilters) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }

        if !filters.is_meaningful() {
            inner.state = PreviewState::Idle;
            drop(inner);
            self.revision.bump();
            return;
        }

        inner.state = PreviewState::Pending;
        let generation = inner.generation;
        inner.task = Some(tokio::spawn(Self::fetch_after_quiet(
            self.api.clone(),
            self.inner.clone(),
            self.revision.clone(),
            self.debounce,
            generation,
            filters,
        )));
        drop(inner);
        self.revision.bump();
    }

    /// Drop any pending preview and show nothing
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.state = PreviewState::Idle;
        drop(inner);
        self.revision.bump();
    }

    async fn fetch_after_quiet(
        api: Arc<A>,
        shared: Arc<Mutex<PreviewInner>>,
        revision: Revision,
        debounce: Duration,
        generation: u64,
        filters: SearchFilters,
    ) {
        tokio::time::sleep(debounce).await;
        debug!(generation, "Fetching preview");
        let result = api.preview(&filters).await;

        {
            let mut inner = shared.lock();
            if inner.generation != generation {
                debug!(generation, current = inner.generation, "Discarding stale preview");
                return;
            }
            inner.task = None;
            inner.state = match result {
                Ok(estimated_count) => PreviewState::Ready(PreviewResult {
                    estimated_count,
                    computed_for: filters,
                    computed_at: Utc::now(),
                }),
                Err(e) => {
                    warn!("Preview failed: {}", e);
                    PreviewState::Failed {
                        message: e.to_string(),
                    }
                }
            };
        }
        revision.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{dental, Reply, ScriptedApi};
    use industrydb_common::{Error, FilterChange};

    const DEBOUNCE: Duration = Duration::from_millis(500);

    fn coordinator(api: Arc<ScriptedApi>) -> PreviewCoordinator<ScriptedApi> {
        PreviewCoordinator::new(api, DEBOUNCE, Revision::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_results_in_single_fetch() {
        let api = ScriptedApi::new();
        api.push_preview(Reply::Now(Ok(42)));
        let preview = coordinator(api.clone());

        let mut filters = SearchFilters::default();
        for industry in ["d", "de", "den", "dent", "dental"] {
            filters.apply(&[FilterChange::Industry(Some(industry.into()))]);
            preview.schedule(filters.clone());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(api.preview_calls(), 0);
        assert_eq!(preview.state(), PreviewState::Pending);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(api.preview_calls(), 1);
        assert_eq!(api.previewed()[0].industry.as_deref(), Some("dental"));

        let result = preview.state().result().cloned().unwrap();
        assert_eq!(result.estimated_count, 42);
        assert_eq!(result.computed_for, filters);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_filters_are_never_fetched() {
        let api = ScriptedApi::new();
        let preview = coordinator(api.clone());

        preview.schedule(SearchFilters::default());
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(api.preview_calls(), 0);
        assert_eq!(preview.state(), PreviewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_criteria_hides_shown_preview() {
        let api = ScriptedApi::new();
        api.push_preview(Reply::Now(Ok(7)));
        let preview = coordinator(api.clone());

        preview.schedule(dental());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(preview.state().estimated_count(), Some(7));

        preview.schedule(SearchFilters::default());
        assert_eq!(preview.state(), PreviewState::Idle);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(api.preview_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_aborts_old_request() {
        let api = ScriptedApi::new();
        let old_gate = api.push_preview_gate();
        api.push_preview(Reply::Now(Ok(3)));
        let preview = coordinator(api.clone());

        preview.schedule(dental());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(api.preview_calls(), 1);

        let newer = SearchFilters {
            country: Some("NL".into()),
            ..dental()
        };
        preview.schedule(newer.clone());
        // The old request may still answer; it must not show up.
        let _ = old_gate.send(Ok(999));
        tokio::task::yield_now().await;
        assert_eq!(preview.state(), PreviewState::Pending);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let result = preview.state().result().cloned().unwrap();
        assert_eq!(result.estimated_count, 3);
        assert_eq!(result.computed_for, newer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_settling_after_filters_moved_is_discarded() {
        let api = ScriptedApi::new();
        let preview = coordinator(api.clone());
        let newer = SearchFilters {
            country: Some("NL".into()),
            ..dental()
        };
        // Filters move while the old request is being answered, before any
        // abort can take effect on the running fetch.
        api.push_preview(Reply::Then(Box::new({
            let preview = preview.clone();
            let newer = newer.clone();
            move || {
                preview.schedule(newer);
                Ok(999)
            }
        })));
        api.push_preview(Reply::Now(Ok(3)));

        preview.schedule(dental());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(api.preview_calls(), 1);
        assert_eq!(preview.state(), PreviewState::Pending);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(api.preview_calls(), 2);
        let result = preview.state().result().cloned().unwrap();
        assert_eq!(result.estimated_count, 3);
        assert_eq!(result.computed_for, newer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_sets_message() {
        let api = ScriptedApi::new();
        api.push_preview(Reply::Now(Err(Error::Server {
            status: 502,
            message: "bad gateway".into(),
        })));
        let preview = coordinator(api.clone());

        preview.schedule(dental());
        tokio::time::sleep(Duration::from_millis(600)).await;

        match preview.state() {
            PreviewState::Failed { message } => assert!(message.contains("bad gateway")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_fetch() {
        let api = ScriptedApi::new();
        let preview = coordinator(api.clone());

        preview.schedule(dental());
        preview.reset();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(api.preview_calls(), 0);
        assert_eq!(preview.state(), PreviewState::Idle);
    }
}
