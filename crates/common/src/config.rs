//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{Error, Result};

/// Environment variable overriding `api.base_url`
pub const ENV_API_URL: &str = "INDUSTRYDB_API_URL";

/// Environment variable overriding `api.token`
pub const ENV_API_TOKEN: &str = "INDUSTRYDB_API_TOKEN";

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Search behaviour
    #[serde(default)]
    pub search: SearchConfig,
}

/// API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the IndustryDB API
    pub base_url: String,

    /// Bearer token for the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Search behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Leads per page
    pub page_size: u32,

    /// Quiet period before a preview fetch
    pub debounce_ms: u64,

    /// Remaining searches at or below which a search asks for confirmation
    pub low_quota_threshold: u64,

    /// Delay between an auth failure and the login redirect
    pub auth_redirect_delay_ms: u64,

    /// Where to send the user when the session is rejected
    pub login_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: 500,
            low_quota_threshold: 10,
            auth_redirect_delay_ms: 2000,
            login_url: "/login".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn auth_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.auth_redirect_delay_ms)
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_API_TOKEN).ok(),
        );
    }

    fn apply_overrides(&mut self, url: Option<String>, token: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("api.base_url is empty".to_string()));
        }
        if self.search.page_size == 0 || self.search.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "search.page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}
