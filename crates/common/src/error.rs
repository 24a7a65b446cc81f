//! Error types for IndustryDB

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Notice;

/// Result type alias using IndustryDB Error
pub type Result<T> = std::result::Result<T, Error>;

/// IndustryDB error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Too many requests{}", retry_after_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Usage limit exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn retry_after_suffix(secs: &Option<u64>) -> String {
    secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default()
}

/// Coarse classification of an [`Error`], used in outcomes and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    RateLimited,
    QuotaExceeded,
    AuthRequired,
    Network,
    Server,
    Cancelled,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::RateLimited => write!(f, "rate_limited"),
            ErrorKind::QuotaExceeded => write!(f, "quota_exceeded"),
            ErrorKind::AuthRequired => write!(f, "auth_required"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Server => write!(f, "server"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Error::AuthRequired(_) => ErrorKind::AuthRequired,
            Error::Network(_) => ErrorKind::Network,
            Error::Server { .. } | Error::Api { .. } | Error::Decode(_) => ErrorKind::Server,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Io(_) | Error::Serialization(_) | Error::InvalidConfig(_) => ErrorKind::Other,
        }
    }

    /// Map an HTTP error status and its body to the error taxonomy.
    ///
    /// A 403 is only a quota error when the body talks about usage or limits;
    /// a bare 403 means the session is no longer accepted.
    pub fn from_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> Self {
        let message = ApiErrorBody::message_from(body);
        match status {
            401 => Error::AuthRequired(message),
            403 if mentions_quota(body) => Error::QuotaExceeded(message),
            403 => Error::AuthRequired(message),
            429 => Error::RateLimited { retry_after_secs },
            500..=599 => Error::Server { status, message },
            _ => Error::Api { status, message },
        }
    }

    /// User-facing notice for this error, `None` for silent outcomes.
    pub fn notice(&self, login_url: &str) -> Option<Notice> {
        match self {
            Error::Cancelled => None,
            Error::Validation(msg) => Some(Notice::Invalid(msg.clone())),
            Error::RateLimited { .. } => Some(Notice::RateLimited),
            Error::QuotaExceeded(_) => Some(Notice::UpgradeRequired),
            Error::AuthRequired(_) => Some(Notice::AuthRequired {
                login_url: login_url.to_string(),
            }),
            other => Some(Notice::Retryable(other.to_string())),
        }
    }
}

fn mentions_quota(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    ["usage", "limit", "quota"].iter().any(|needle| body.contains(needle))
}

/// JSON error envelope returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiErrorBody {
    /// Best human-readable message from a raw error body
    pub fn message_from(body: &str) -> String {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        parsed
            .and_then(|b| b.detail.or(b.message).or(b.error))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "no details".to_string()
                } else {
                    trimmed.chars().take(200).collect()
                }
            })
    }
}
