//! Result count preview command

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use industrydb_common::PreviewResult;
use industrydb_search::PreviewState;
use serde::Serialize;

use super::{Context, FilterArgs};
use crate::output::{print_item, TableDisplay};

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Serialize)]
struct PreviewDisplay<'a>(&'a PreviewResult);

impl TableDisplay for PreviewDisplay<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Estimated leads", "Filters", "Computed at"]
    }

    fn row(&self) -> Vec<String> {
        let filters = self
            .0
            .computed_for
            .query_pairs()
            .into_iter()
            .filter(|(k, _)| *k != "page" && *k != "limit")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        vec![
            self.0.estimated_count.to_string(),
            filters,
            self.0.computed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]
    }
}

pub async fn execute(args: PreviewArgs, ctx: &Context) -> Result<()> {
    let coordinator = ctx.coordinator(&ctx.config.search)?;
    let mut changes = coordinator.subscribe();

    coordinator.set_filters(args.filters.changes());
    if matches!(coordinator.state().preview, PreviewState::Idle) {
        bail!("Set at least an industry, country or contact filter to preview");
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Estimating matching leads...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let deadline = ctx.config.search.debounce() + ctx.config.api.timeout();
    let settled = tokio::time::timeout(deadline, async {
        loop {
            match coordinator.state().preview {
                PreviewState::Ready(result) => return Ok(result),
                PreviewState::Failed { message } => return Err(message),
                PreviewState::Idle => return Err("preview was reset".to_string()),
                PreviewState::Pending => {}
            }
            if changes.changed().await.is_err() {
                return Err("preview stopped".to_string());
            }
        }
    })
    .await;
    spinner.finish_and_clear();

    match settled {
        Ok(Ok(result)) => {
            print_item(&PreviewDisplay(&result), ctx.format);
            Ok(())
        }
        Ok(Err(message)) => bail!("Preview failed: {}", message),
        Err(_) => bail!("Preview timed out after {:?}", deadline),
    }
}
