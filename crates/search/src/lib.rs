//! IndustryDB Search
//!
//! Client-side coordination of the lead search page:
//!
//! ```text
//! set_filter ──► FilterState ──► PreviewCoordinator ──(500 ms quiet)──► preview()
//!                     │
//! execute_search ─────┴────────► SearchExecutor ──(cancel previous)──► search()
//!                                     │    ▲
//!                                     ▼    │ low-quota check
//!                                 UsageTracker ─────────────────────► usage()
//! ```
//!
//! All network access goes through [`LeadsApi`]; [`HttpClient`] talks to the
//! real API.

pub mod api;
pub mod client;
pub mod coordinator;
pub mod executor;
pub mod filters;
pub mod preview;
pub mod shell;
pub mod state;
pub mod usage;

#[cfg(test)]
pub(crate) mod mock;

pub use api::LeadsApi;
pub use client::HttpClient;
pub use coordinator::{CoordinatorState, SearchCoordinator};
pub use executor::{ExecutorState, SearchExecutor, SearchOutcome};
pub use filters::{FilterState, FilterUpdate};
pub use preview::{PreviewCoordinator, PreviewState};
pub use shell::{NoopShell, Shell};
pub use state::Revision;
pub use usage::UsageTracker;
