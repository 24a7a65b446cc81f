//! IndustryDB E2E Test Framework
//!
//! Runs the search client against an in-process mock of the IndustryDB API:
//!
//! ```text
//! ┌──────────────────────────┐   HTTP    ┌──────────────────────────────┐
//! │ SearchCoordinator        │ ────────► │ MockApiServer (axum)         │
//! │   └── HttpClient         │           │   GET  /api/v1/leads/search  │
//! └──────────────────────────┘           │   POST /api/v1/leads/preview │
//!                                        │   GET  /api/v1/usage         │
//!                                        │   GET  /health               │
//!                                        └──────────────────────────────┘
//! ```
//!
//! Each endpoint answers from a queue of [`MockReply`]s and records what it
//! received.

pub mod error;
pub mod server;

pub use error::{E2eError, E2eResult};
pub use server::{
    error_body, leads_page, usage_body, Endpoint, MockApiServer, MockReply, Recorded,
    ServerConfig,
};

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
