//! Scripted in-memory API for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use industrydb_common::{Error, Lead, Pagination, Result, SearchFilters, SearchResultPage, UsageInfo};

use crate::api::LeadsApi;
use crate::shell::Shell;

/// How a scripted call answers
pub enum Reply<T> {
    Now(Result<T>),
    /// Held until the test sends the result
    Gated(oneshot::Receiver<Result<T>>),
    /// Computed while the call is being served
    Then(Box<dyn FnOnce() -> Result<T> + Send>),
}

#[derive(Default)]
pub struct ScriptedApi {
    searches: Mutex<VecDeque<Reply<SearchResultPage>>>,
    previews: Mutex<VecDeque<Reply<u64>>>,
    usage: Mutex<Option<UsageInfo>>,
    search_calls: AtomicUsize,
    preview_calls: AtomicUsize,
    usage_calls: AtomicUsize,
    searched: Mutex<Vec<(SearchFilters, CancellationToken)>>,
    previewed: Mutex<Vec<SearchFilters>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_usage(remaining: u64) -> Arc<Self> {
        let api = Self::new();
        api.set_usage(remaining);
        api
    }

    pub fn set_usage(&self, remaining: u64) {
        *self.usage.lock() = Some(usage(remaining));
    }

    pub fn push_search(&self, reply: Reply<SearchResultPage>) {
        self.searches.lock().push_back(reply);
    }

    pub fn push_search_gate(&self) -> oneshot::Sender<Result<SearchResultPage>> {
        let (tx, rx) = oneshot::channel();
        self.push_search(Reply::Gated(rx));
        tx
    }

    pub fn push_preview(&self, reply: Reply<u64>) {
        self.previews.lock().push_back(reply);
    }

    pub fn push_preview_gate(&self) -> oneshot::Sender<Result<u64>> {
        let (tx, rx) = oneshot::channel();
        self.push_preview(Reply::Gated(rx));
        tx
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn preview_calls(&self) -> usize {
        self.preview_calls.load(Ordering::SeqCst)
    }

    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }

    pub fn searched(&self) -> Vec<(SearchFilters, CancellationToken)> {
        self.searched.lock().clone()
    }

    pub fn previewed(&self) -> Vec<SearchFilters> {
        self.previewed.lock().clone()
    }
}

async fn answer<T>(reply: Option<Reply<T>>) -> Result<T> {
    match reply {
        Some(Reply::Now(result)) => result,
        Some(Reply::Gated(rx)) => rx
            .await
            .unwrap_or_else(|_| Err(Error::Network("gate dropped".to_string()))),
        Some(Reply::Then(answer)) => answer(),
        None => Err(Error::Network("no scripted reply".to_string())),
    }
}

#[async_trait]
impl LeadsApi for ScriptedApi {
    // Ignores the token on purpose: late responses must be discarded by the caller.
    async fn search(
        &self,
        filters: &SearchFilters,
        cancel: &CancellationToken,
    ) -> Result<SearchResultPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searched.lock().push((filters.clone(), cancel.clone()));
        let reply = self.searches.lock().pop_front();
        answer(reply).await
    }

    async fn preview(&self, filters: &SearchFilters) -> Result<u64> {
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        self.previewed.lock().push(filters.clone());
        let reply = self.previews.lock().pop_front();
        answer(reply).await
    }

    async fn usage(&self) -> Result<UsageInfo> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        self.usage
            .lock()
            .clone()
            .ok_or_else(|| Error::Network("usage unavailable".to_string()))
    }
}

/// Shell that records what it was asked to do
#[derive(Default)]
pub struct RecordingShell {
    pub sessions_cleared: AtomicUsize,
    pub redirects: Mutex<Vec<String>>,
}

impl Shell for RecordingShell {
    fn clear_session(&self) {
        self.sessions_cleared.fetch_add(1, Ordering::SeqCst);
    }

    fn redirect_to_login(&self, login_url: &str) {
        self.redirects.lock().push(login_url.to_string());
    }
}

pub fn usage(remaining: u64) -> UsageInfo {
    UsageInfo {
        remaining,
        limit: 100,
        used: 100u64.saturating_sub(remaining),
        tier: "starter".to_string(),
    }
}

pub fn lead(id: i64, name: &str) -> Lead {
    Lead {
        id,
        company_name: name.to_string(),
        industry: Some("dental".to_string()),
        country: Some("DE".to_string()),
        city: None,
        email: None,
        phone: None,
        website: None,
        verified: false,
        quality_score: None,
    }
}

pub fn page(leads: Vec<Lead>) -> SearchResultPage {
    let total = leads.len() as u64;
    SearchResultPage {
        items: leads,
        pagination: Pagination {
            total,
            total_pages: 1,
            has_next: false,
            has_prev: false,
        },
    }
}

pub fn dental() -> SearchFilters {
    SearchFilters {
        industry: Some("dental".to_string()),
        ..Default::default()
    }
}

/// Let spawned tasks run until `cond` holds
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
