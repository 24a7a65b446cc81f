//! Search coordinator
//!
//! The object a UI binds to. It owns the filter state, preview, executor,
//! and usage tracker; each owns disjoint parts of the displayed state and
//! they only affect each other through the calls made here.

use std::sync::Arc;

use industrydb_common::{
    FilterChange, Lead, Notice, Pagination, SearchConfig, SearchFilters, UsageInfo,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::api::LeadsApi;
use crate::executor::{SearchExecutor, SearchOutcome};
use crate::filters::FilterState;
use crate::preview::{PreviewCoordinator, PreviewState};
use crate::shell::{NoopShell, Shell};
use crate::state::Revision;
use crate::usage::UsageTracker;

/// Everything a presentation layer needs to render the search page
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorState {
    pub filters: SearchFilters,
    pub leads: Vec<Lead>,
    pub pagination: Option<Pagination>,
    pub preview: PreviewState,
    pub usage: Option<UsageInfo>,
    pub loading: bool,
    pub notice: Option<Notice>,
    pub awaiting_confirmation: bool,
}

pub struct SearchCoordinator<A: LeadsApi, S: Shell = NoopShell> {
    filters: FilterState,
    preview: PreviewCoordinator<A>,
    executor: SearchExecutor<A, S>,
    usage: UsageTracker<A>,
    revision: Revision,
}

impl<A: LeadsApi, S: Shell> Clone for SearchCoordinator<A, S> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            preview: self.preview.clone(),
            executor: self.executor.clone(),
            usage: self.usage.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<A: LeadsApi> SearchCoordinator<A, NoopShell> {
    /// Coordinator without a UI shell
    pub fn headless(api: Arc<A>, config: &SearchConfig) -> Self {
        Self::new(api, Arc::new(NoopShell), config)
    }
}

impl<A: LeadsApi, S: Shell> SearchCoordinator<A, S> {
    pub fn new(api: Arc<A>, shell: Arc<S>, config: &SearchConfig) -> Self {
        let revision = Revision::new();
        let filters = FilterState::new(config.page_size);
        let usage = UsageTracker::new(api.clone(), config.low_quota_threshold, revision.clone());

        // The page only becomes current once a search for it is sent
        let committed = filters.clone();
        let executor = SearchExecutor::new(api.clone(), usage.clone(), shell, config, revision.clone())
            .with_dispatch_hook(Arc::new(move |dispatched: &SearchFilters| {
                committed.set([FilterChange::Page(dispatched.page)]);
            }));

        Self {
            filters,
            preview: PreviewCoordinator::new(api, config.debounce(), revision.clone()),
            executor,
            usage,
            revision,
        }
    }

    /// Mount: load the quota snapshot
    pub async fn init(&self) -> Option<UsageInfo> {
        self.usage.refresh_logged().await
    }

    pub fn filters(&self) -> SearchFilters {
        self.filters.get()
    }

    pub fn set_filter(&self, change: FilterChange) -> SearchFilters {
        self.set_filters([change])
    }

    /// Apply filter edits and reschedule the preview.
    ///
    /// Page-only edits leave the preview alone; the count does not depend on it.
    pub fn set_filters<I>(&self, changes: I) -> SearchFilters
    where
        I: IntoIterator<Item = FilterChange>,
    {
        let update = self.filters.set(changes);
        if update.page_only {
            self.revision.bump();
        } else {
            self.preview.schedule(update.filters.clone());
        }
        update.filters
    }

    /// Reset filters, drop the preview and cancel and clear results
    pub fn clear_filters(&self) {
        self.filters.clear();
        self.preview.reset();
        self.executor.reset();
    }

    /// Search with the current filters
    pub async fn execute_search(&self) -> SearchOutcome {
        self.executor.execute(self.filters.get()).await
    }

    pub async fn confirm_search(&self) -> SearchOutcome {
        self.executor.confirm().await
    }

    pub fn dismiss_confirmation(&self) {
        self.executor.dismiss_confirmation();
    }

    /// Jump to a result page and search it.
    ///
    /// The filter page is left alone unless the search is actually sent.
    pub async fn go_to_page(&self, page: u32) -> SearchOutcome {
        if let Some(pagination) = self.executor.state().pagination {
            let last = pagination.total_pages.max(1);
            if page == 0 || page > last {
                return SearchOutcome::Rejected {
                    reason: format!("page {} is outside 1..={}", page, last),
                };
            }
        }
        let mut target = self.filters.get();
        target.apply(&[FilterChange::Page(page)]);
        self.executor.execute(target).await
    }

    pub async fn next_page(&self) -> SearchOutcome {
        match self.executor.state().pagination {
            Some(p) if p.has_next => self.go_to_page(self.filters.get().page + 1).await,
            _ => SearchOutcome::Rejected {
                reason: "already on the last page".to_string(),
            },
        }
    }

    pub async fn prev_page(&self) -> SearchOutcome {
        match self.executor.state().pagination {
            Some(p) if p.has_prev => {
                self.go_to_page(self.filters.get().page.saturating_sub(1)).await
            }
            _ => SearchOutcome::Rejected {
                reason: "already on the first page".to_string(),
            },
        }
    }

    /// Apply filters and search at once, taking over any running search
    pub async fn quick_search<I>(&self, changes: I) -> SearchOutcome
    where
        I: IntoIterator<Item = FilterChange>,
    {
        let filters = self.set_filters(changes);
        debug!(?filters, "Quick search");
        self.executor.supersede(filters).await
    }

    pub async fn refresh_usage(&self) -> Option<UsageInfo> {
        self.usage.refresh_logged().await
    }

    pub fn state(&self) -> CoordinatorState {
        let executor = self.executor.state();
        CoordinatorState {
            filters: self.filters.get(),
            leads: executor.leads,
            pagination: executor.pagination,
            preview: self.preview.state(),
            usage: self.usage.snapshot(),
            loading: executor.loading,
            notice: executor.notice,
            awaiting_confirmation: executor.awaiting_confirmation.is_some(),
        }
    }

    /// Revision counter that changes whenever [`state`](Self::state) may have
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
