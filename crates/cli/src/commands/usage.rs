//! Quota command

use anyhow::Result;
use industrydb_common::UsageInfo;
use industrydb_search::LeadsApi;
use serde::Serialize;

use super::Context;
use crate::output::{print_item, print_warning, TableDisplay};

#[derive(Serialize)]
struct UsageDisplay<'a>(&'a UsageInfo);

impl TableDisplay for UsageDisplay<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Tier", "Used", "Limit", "Remaining"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.0.tier.clone(),
            self.0.used.to_string(),
            self.0.limit.to_string(),
            self.0.remaining.to_string(),
        ]
    }
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let usage = client.usage().await?;

    print_item(&UsageDisplay(&usage), ctx.format);

    if usage.is_exhausted() {
        print_warning("No searches left in your plan. Upgrade to continue.");
    } else if usage.is_low(ctx.config.search.low_quota_threshold) {
        print_warning(&format!(
            "Running low: {} of {} searches left",
            usage.remaining, usage.limit
        ));
    }
    Ok(())
}
