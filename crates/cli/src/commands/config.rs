//! Configuration commands

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use industrydb_common::ClientConfig;
use serde::Serialize;

use crate::output::{print_item, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with defaults
    Init {
        /// API base URL
        #[arg(long)]
        api_url: Option<String>,

        /// API token
        #[arg(long)]
        token: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct ConfigDisplay {
    path: String,
    base_url: String,
    token: String,
    timeout_secs: u64,
    page_size: u32,
    debounce_ms: u64,
    low_quota_threshold: u64,
}

impl ConfigDisplay {
    fn new(path: &Path, config: &ClientConfig) -> Self {
        Self {
            path: path.display().to_string(),
            base_url: config.api.base_url.clone(),
            token: mask(config.api.token.as_deref()),
            timeout_secs: config.api.timeout_secs,
            page_size: config.search.page_size,
            debounce_ms: config.search.debounce_ms,
            low_quota_threshold: config.search.low_quota_threshold,
        }
    }
}

impl TableDisplay for ConfigDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["File", "API URL", "Token", "Timeout", "Page size", "Debounce", "Low quota at"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.path.clone(),
            self.base_url.clone(),
            self.token.clone(),
            format!("{}s", self.timeout_secs),
            self.page_size.to_string(),
            format!("{}ms", self.debounce_ms),
            self.low_quota_threshold.to_string(),
        ]
    }
}

fn mask(token: Option<&str>) -> String {
    match token {
        None => "(none)".to_string(),
        Some(t) if t.len() <= 8 => "****".to_string(),
        Some(t) => format!("{}****", t.chars().take(4).collect::<String>()),
    }
}

pub fn execute(cmd: ConfigCommands, path: &Path, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let mut config = ClientConfig::load(path)?;
            config.apply_env();
            print_item(&ConfigDisplay::new(path, &config), format);
        }

        ConfigCommands::Init {
            api_url,
            token,
            force,
        } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists, pass --force to overwrite",
                    path.display()
                );
            }
            let mut config = ClientConfig::default();
            if let Some(url) = api_url {
                config.api.base_url = url;
            }
            config.api.token = token;
            config.validate()?;
            config.save(path)?;
            print_success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}
