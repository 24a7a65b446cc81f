//! IndustryDB CLI - Main Entry Point
//!
//! Search business leads, preview result counts and check the remaining
//! quota from the terminal.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use industrydb_common::ClientConfig;

mod commands;
mod output;
mod shell;

use commands::{config, preview, search, usage, Context};

/// IndustryDB CLI - Lead search from the terminal
#[derive(Parser)]
#[command(name = "industrydb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ~/.industrydb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overrides the configuration file
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search leads
    Search(search::SearchArgs),

    /// Estimate how many leads match the filters
    Preview(preview::PreviewArgs),

    /// Show the remaining search quota
    Usage,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(industrydb_common::default_config_path);

    // Config commands work on the file as written, without overrides
    let command = match cli.command {
        Commands::Config(cmd) => return config::execute(cmd, &config_path, cli.format),
        other => other,
    };

    let mut client_config = ClientConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    client_config.apply_env();
    if let Some(url) = cli.api_url {
        client_config.api.base_url = url;
    }
    client_config.validate()?;

    let ctx = Context {
        config: client_config,
        config_path,
        format: cli.format,
    };

    match command {
        Commands::Search(args) => search::execute(args, &ctx).await?,
        Commands::Preview(args) => preview::execute(args, &ctx).await?,
        Commands::Usage => usage::execute(&ctx).await?,
        Commands::Version | Commands::Config(_) => {
            println!("IndustryDB CLI v{}", industrydb_common::VERSION);
            println!("API: {}", ctx.config.api.base_url);
        }
    }

    Ok(())
}
