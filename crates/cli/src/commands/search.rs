//! Lead search command

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use industrydb_common::{Lead, Notice, SearchConfig};
use industrydb_search::{HttpClient, SearchCoordinator, SearchOutcome};
use serde::Serialize;
use tracing::debug;

use super::{Context, FilterArgs};
use crate::output::{self, print_info, print_list, print_warning, OutputFormat, TableDisplay};
use crate::shell::CliShell;

type Coordinator = SearchCoordinator<HttpClient, CliShell>;

#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Result page to start at
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Leads per page (1-100)
    #[arg(long)]
    pub limit: Option<u32>,

    /// Number of consecutive pages to fetch
    #[arg(long, default_value = "1")]
    pub pages: u32,

    /// Skip the low-quota confirmation
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Serialize)]
struct LeadDisplay<'a>(&'a Lead);

impl TableDisplay for LeadDisplay<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Company", "Industry", "Location", "Email", "Phone", "Verified"]
    }

    fn row(&self) -> Vec<String> {
        let lead = self.0;
        let location = match (&lead.city, &lead.country) {
            (Some(city), Some(country)) => format!("{}, {}", city, country),
            (None, Some(country)) => country.clone(),
            (Some(city), None) => city.clone(),
            (None, None) => "-".to_string(),
        };
        vec![
            lead.id.to_string(),
            lead.company_name.clone(),
            lead.industry.clone().unwrap_or_else(|| "-".to_string()),
            location,
            lead.email.clone().unwrap_or_else(|| "-".to_string()),
            lead.phone.clone().unwrap_or_else(|| "-".to_string()),
            if lead.verified { "✓".to_string() } else { "".to_string() },
        ]
    }
}

pub async fn execute(args: SearchArgs, ctx: &Context) -> Result<()> {
    let mut search = ctx.config.search.clone();
    if let Some(limit) = args.limit {
        search.page_size = limit;
    }
    let coordinator = ctx.coordinator(&search)?;

    if let Some(usage) = coordinator.init().await {
        debug!(remaining = usage.remaining, tier = %usage.tier, "Quota loaded");
    }
    coordinator.set_filters(args.filters.changes());

    let outcome = if args.page > 1 {
        coordinator.go_to_page(args.page).await
    } else {
        coordinator.execute_search().await
    };
    if !settle(&coordinator, outcome, args.yes, &search, ctx.format).await? {
        return Ok(());
    }

    for _ in 1..args.pages {
        let has_next = coordinator
            .state()
            .pagination
            .map(|p| p.has_next)
            .unwrap_or(false);
        if !has_next {
            break;
        }
        let outcome = coordinator.next_page().await;
        if !settle(&coordinator, outcome, args.yes, &search, ctx.format).await? {
            break;
        }
    }

    warn_if_low(&coordinator, &search);
    Ok(())
}

/// Drive one outcome to its end, asking for confirmation when the quota
/// is low. Returns false when the user declined.
async fn settle(
    coordinator: &Coordinator,
    mut outcome: SearchOutcome,
    assume_yes: bool,
    search: &SearchConfig,
    format: OutputFormat,
) -> Result<bool> {
    if let SearchOutcome::ConfirmationRequired { remaining } = outcome {
        let question = format!(
            "Only {} searches left in your plan. Run this search anyway?",
            remaining
        );
        if !assume_yes && !output::confirm(&question) {
            coordinator.dismiss_confirmation();
            print_info("Search cancelled");
            return Ok(false);
        }
        outcome = coordinator.confirm_search().await;
    }

    match outcome {
        SearchOutcome::Completed { .. } => {
            render_page(coordinator, format);
            Ok(true)
        }
        SearchOutcome::Failed { kind } => {
            let state = coordinator.state();
            if let Some(Notice::AuthRequired { .. }) = state.notice {
                // Let the delayed login prompt fire before exiting
                tokio::time::sleep(search.auth_redirect_delay()).await;
                tokio::task::yield_now().await;
            }
            match state.notice {
                Some(notice) => bail!("{}", notice),
                None => bail!("Search failed ({})", kind),
            }
        }
        SearchOutcome::Rejected { reason } => bail!("{}", reason),
        other => bail!("Search did not complete: {:?}", other),
    }
}

fn render_page(coordinator: &Coordinator, format: OutputFormat) {
    let state = coordinator.state();
    let rows: Vec<LeadDisplay> = state.leads.iter().map(LeadDisplay).collect();
    print_list(&rows, format);

    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        if let Some(p) = state.pagination {
            println!(
                "{} {} of {} ({} leads)",
                "Page".dimmed(),
                state.filters.page,
                p.total_pages.max(1),
                p.total
            );
        }
    }
}

fn warn_if_low(coordinator: &Coordinator, search: &SearchConfig) {
    if let Some(usage) = coordinator.state().usage {
        if usage.is_exhausted() {
            print_warning("No searches left in your plan. Upgrade to continue.");
        } else if usage.is_low(search.low_quota_threshold) {
            print_warning(&format!("{} searches left in your plan", usage.remaining));
        }
    }
}
