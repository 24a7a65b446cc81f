//! Terminal shell for the search coordinator

use std::path::PathBuf;

use industrydb_common::ClientConfig;
use industrydb_search::Shell;
use tracing::{debug, warn};

use crate::output::print_warning;

/// Drops the stored token and points the user at the login page
pub struct CliShell {
    config_path: PathBuf,
    base_url: String,
}

impl CliShell {
    pub fn new(config_path: PathBuf, base_url: String) -> Self {
        Self {
            config_path,
            base_url,
        }
    }

    fn forget_token(&self) -> industrydb_common::Result<bool> {
        if !self.config_path.exists() {
            return Ok(false);
        }
        let mut config = ClientConfig::load(&self.config_path)?;
        if config.api.token.take().is_none() {
            return Ok(false);
        }
        config.save(&self.config_path)?;
        Ok(true)
    }
}

impl Shell for CliShell {
    fn clear_session(&self) {
        match self.forget_token() {
            Ok(true) => debug!("Removed API token from {}", self.config_path.display()),
            Ok(false) => {}
            Err(e) => warn!("Failed to clear stored token: {}", e),
        }
    }

    fn redirect_to_login(&self, login_url: &str) {
        let url = if login_url.starts_with("http") {
            login_url.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), login_url)
        };
        print_warning(&format!("Sign in again at {}", url));
    }
}
