//! Search executor
//!
//! Runs the authoritative paginated search. At most one request is live:
//! dispatching a new one cancels the previous token and bumps the request
//! generation, and a response is only applied if its generation is still
//! current when it settles. Only the newest request clears the loading latch.

use std::sync::Arc;
use std::time::Duration;

use industrydb_common::{
    Error, ErrorKind, Lead, Notice, Pagination, SearchConfig, SearchFilters, MAX_PAGE_SIZE,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::LeadsApi;
use crate::shell::Shell;
use crate::state::Revision;
use crate::usage::UsageTracker;

/// How a search invocation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Results replaced
    Completed { total: u64, items: usize },
    /// Another search holds the loading latch
    Busy,
    /// Quota is low; waiting for [`SearchExecutor::confirm`]
    ConfirmationRequired { remaining: u64 },
    NothingToConfirm,
    /// Filters failed validation, nothing was sent
    Rejected { reason: String },
    /// A newer search took over; this response was ignored
    Superseded,
    Failed { kind: ErrorKind },
}

/// Displayed state owned by the executor
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutorState {
    pub leads: Vec<Lead>,
    pub pagination: Option<Pagination>,
    pub loading: bool,
    pub notice: Option<Notice>,
    pub awaiting_confirmation: Option<SearchFilters>,
}

struct ExecutorInner {
    view: ExecutorState,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

#[derive(Clone, Copy)]
struct Admission {
    respect_latch: bool,
    check_quota: bool,
}

struct Ticket {
    generation: u64,
    token: CancellationToken,
}

/// Called under the executor lock with the filters of every dispatched search
pub type DispatchHook = Arc<dyn Fn(&SearchFilters) + Send + Sync>;

/// Releases the loading latch when a dispatched search is dropped before it
/// settles, as long as no newer search has taken over.
struct InFlight<'a> {
    inner: &'a Mutex<ExecutorInner>,
    revision: &'a Revision,
    generation: u64,
    armed: bool,
}

impl InFlight<'_> {
    fn settled(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let released = {
            let mut inner = self.inner.lock();
            if inner.generation == self.generation {
                if let Some(token) = inner.in_flight.take() {
                    token.cancel();
                }
                inner.view.loading = false;
                true
            } else {
                false
            }
        };
        if released {
            debug!(generation = self.generation, "Search abandoned, releasing latch");
            self.revision.bump();
        }
    }
}

pub struct SearchExecutor<A: LeadsApi, S: Shell> {
    api: Arc<A>,
    usage: UsageTracker<A>,
    shell: Arc<S>,
    login_url: String,
    auth_redirect_delay: Duration,
    inner: Arc<Mutex<ExecutorInner>>,
    on_dispatch: Option<DispatchHook>,
    revision: Revision,
}

impl<A: LeadsApi, S: Shell> Clone for SearchExecutor<A, S> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            usage: self.usage.clone(),
            shell: self.shell.clone(),
            login_url: self.login_url.clone(),
            auth_redirect_delay: self.auth_redirect_delay,
            inner: self.inner.clone(),
            on_dispatch: self.on_dispatch.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<A: LeadsApi, S: Shell> SearchExecutor<A, S> {
    pub fn new(
        api: Arc<A>,
        usage: UsageTracker<A>,
        shell: Arc<S>,
        config: &SearchConfig,
        revision: Revision,
    ) -> Self {
        Self {
            api,
            usage,
            shell,
            login_url: config.login_url.clone(),
            auth_redirect_delay: config.auth_redirect_delay(),
            inner: Arc::new(Mutex::new(ExecutorInner {
                view: ExecutorState::default(),
                generation: 0,
                in_flight: None,
            })),
            on_dispatch: None,
            revision,
        }
    }

    /// Run `hook` each time a search is actually sent
    pub fn with_dispatch_hook(mut self, hook: DispatchHook) -> Self {
        self.on_dispatch = Some(hook);
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.inner.lock().view.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().view.loading
    }

    /// Search on explicit user request.
    ///
    /// A no-op while another search is loading. Asks for confirmation first
    /// when the remaining quota is low.
    pub async fn execute(&self, filters: SearchFilters) -> SearchOutcome {
        let admission = Admission {
            respect_latch: true,
            check_quota: true,
        };
        match self.admit(&filters, admission) {
            Ok(ticket) => self.run(filters, ticket).await,
            Err(outcome) => outcome,
        }
    }

    /// Proceed with the search parked by a low-quota confirmation
    pub async fn confirm(&self) -> SearchOutcome {
        let parked = self.inner.lock().view.awaiting_confirmation.clone();
        let Some(filters) = parked else {
            return SearchOutcome::NothingToConfirm;
        };
        let admission = Admission {
            respect_latch: true,
            check_quota: false,
        };
        match self.admit(&filters, admission) {
            Ok(ticket) => self.run(filters, ticket).await,
            Err(outcome) => outcome,
        }
    }

    pub fn dismiss_confirmation(&self) {
        if self.inner.lock().view.awaiting_confirmation.take().is_some() {
            self.revision.bump();
        }
    }

    /// Search that takes over from whatever is in flight (quick search)
    pub async fn supersede(&self, filters: SearchFilters) -> SearchOutcome {
        let admission = Admission {
            respect_latch: false,
            check_quota: true,
        };
        match self.admit(&filters, admission) {
            Ok(ticket) => self.run(filters, ticket).await,
            Err(outcome) => outcome,
        }
    }

    /// Cancel in-flight work and clear displayed results
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if let Some(token) = inner.in_flight.take() {
            token.cancel();
        }
        inner.view = ExecutorState::default();
        drop(inner);
        self.revision.bump();
    }

    /// Checks and latch acquisition happen under one lock so that two
    /// concurrent invocations cannot both dispatch.
    fn admit(&self, filters: &SearchFilters, admission: Admission) -> Result<Ticket, SearchOutcome> {
        let mut inner = self.inner.lock();

        if admission.respect_latch && inner.view.loading {
            debug!("Search already in progress, ignoring");
            return Err(SearchOutcome::Busy);
        }

        if let Err(e) = validate(filters) {
            let reason = e.to_string();
            inner.view.notice = e.notice(&self.login_url);
            drop(inner);
            self.revision.bump();
            return Err(SearchOutcome::Rejected { reason });
        }

        if admission.check_quota && self.usage.is_low() {
            let remaining = self.usage.snapshot().map_or(0, |u| u.remaining);
            info!(remaining, "Quota is low, waiting for confirmation");
            inner.view.awaiting_confirmation = Some(filters.clone());
            drop(inner);
            self.revision.bump();
            return Err(SearchOutcome::ConfirmationRequired { remaining });
        }

        inner.generation += 1;
        let token = CancellationToken::new();
        if let Some(previous) = inner.in_flight.replace(token.clone()) {
            debug!(generation = inner.generation, "Cancelling in-flight search");
            previous.cancel();
        }
        inner.view.loading = true;
        inner.view.notice = None;
        inner.view.awaiting_confirmation = None;
        if let Some(hook) = &self.on_dispatch {
            hook(filters);
        }
        let generation = inner.generation;
        drop(inner);
        self.revision.bump();

        Ok(Ticket { generation, token })
    }

    async fn run(&self, filters: SearchFilters, ticket: Ticket) -> SearchOutcome {
        info!(generation = ticket.generation, page = filters.page, "Dispatching search");
        let guard = InFlight {
            inner: &self.inner,
            revision: &self.revision,
            generation: ticket.generation,
            armed: true,
        };
        let result = self.api.search(&filters, &ticket.token).await;
        guard.settled();

        let settled = {
            let mut inner = self.inner.lock();
            if inner.generation != ticket.generation {
                debug!(
                    generation = ticket.generation,
                    current = inner.generation,
                    "Ignoring superseded search response"
                );
                return SearchOutcome::Superseded;
            }
            inner.in_flight = None;
            inner.view.loading = false;

            match result {
                Ok(page) => {
                    let total = page.pagination.total;
                    let items = page.items.len();
                    inner.view.leads = page.items;
                    inner.view.pagination = Some(page.pagination);
                    Ok(SearchOutcome::Completed { total, items })
                }
                Err(e) => {
                    inner.view.notice = e.notice(&self.login_url);
                    Err(e)
                }
            }
        };
        self.revision.bump();

        match settled {
            Ok(outcome) => {
                info!(?outcome, "Search completed");
                self.usage.refresh_logged().await;
                outcome
            }
            Err(e) => {
                let kind = e.kind();
                self.handle_failure(e).await;
                SearchOutcome::Failed { kind }
            }
        }
    }

    async fn handle_failure(&self, error: Error) {
        match error.kind() {
            ErrorKind::Cancelled => debug!("Search cancelled"),
            ErrorKind::RateLimited => warn!("Search rate limited: {}", error),
            ErrorKind::QuotaExceeded => {
                warn!("Usage limit reached: {}", error);
                self.usage.refresh_logged().await;
            }
            ErrorKind::AuthRequired => {
                warn!("Session rejected: {}", error);
                self.shell.clear_session();
                let shell = self.shell.clone();
                let login_url = self.login_url.clone();
                let delay = self.auth_redirect_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    shell.redirect_to_login(&login_url);
                });
            }
            _ => warn!("Search failed: {}", error),
        }
    }
}

fn validate(filters: &SearchFilters) -> industrydb_common::Result<()> {
    if filters.page == 0 {
        return Err(Error::Validation("page must be at least 1".to_string()));
    }
    if filters.limit == 0 || filters.limit > MAX_PAGE_SIZE {
        return Err(Error::Validation(format!(
            "page size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    if !filters.is_meaningful() {
        return Err(Error::Validation(
            "select an industry, a country or a quality filter first".to_string(),
        ));
    }
    Ok(())
}
