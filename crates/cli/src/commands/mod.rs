//! CLI Commands

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use industrydb_common::{ClientConfig, FilterChange, SearchConfig};
use industrydb_search::{HttpClient, SearchCoordinator};

use crate::output::OutputFormat;
use crate::shell::CliShell;

pub mod config;
pub mod preview;
pub mod search;
pub mod usage;

/// Resolved settings shared by every command
pub struct Context {
    pub config: ClientConfig,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn client(&self) -> anyhow::Result<Arc<HttpClient>> {
        Ok(Arc::new(HttpClient::new(&self.config.api)?))
    }

    pub fn coordinator(
        &self,
        search: &SearchConfig,
    ) -> anyhow::Result<SearchCoordinator<HttpClient, CliShell>> {
        let shell = Arc::new(CliShell::new(
            self.config_path.clone(),
            self.config.api.base_url.clone(),
        ));
        Ok(SearchCoordinator::new(self.client()?, shell, search))
    }
}

/// Filter flags shared by `search` and `preview`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Industry, e.g. "dental"
    #[arg(long, short)]
    pub industry: Option<String>,

    /// Country code, e.g. "DE"
    #[arg(long, short)]
    pub country: Option<String>,

    /// City (narrows a country)
    #[arg(long)]
    pub city: Option<String>,

    /// Only leads with (true) or without (false) an email address
    #[arg(long)]
    pub has_email: Option<bool>,

    /// Only leads with (true) or without (false) a phone number
    #[arg(long)]
    pub has_phone: Option<bool>,

    /// Only verified (true) or unverified (false) leads
    #[arg(long)]
    pub verified: Option<bool>,
}

impl FilterArgs {
    /// Edits for the flags actually given
    pub fn changes(&self) -> Vec<FilterChange> {
        let mut changes = Vec::new();
        if self.industry.is_some() {
            changes.push(FilterChange::Industry(self.industry.clone()));
        }
        if self.country.is_some() {
            changes.push(FilterChange::Country(self.country.clone()));
        }
        if self.city.is_some() {
            changes.push(FilterChange::City(self.city.clone()));
        }
        if self.has_email.is_some() {
            changes.push(FilterChange::HasEmail(self.has_email));
        }
        if self.has_phone.is_some() {
            changes.push(FilterChange::HasPhone(self.has_phone));
        }
        if self.verified.is_some() {
            changes.push(FilterChange::Verified(self.verified));
        }
        changes
    }
}
