//! Backend seam
//!
//! Everything the coordinator needs from the IndustryDB API. The HTTP
//! implementation lives in [`crate::client`]; tests substitute scripted ones.

use async_trait::async_trait;
use industrydb_common::{Result, SearchFilters, SearchResultPage, UsageInfo};
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait LeadsApi: Send + Sync + 'static {
    /// Run the authoritative paginated search.
    ///
    /// Implementations should stop waiting and return `Error::Cancelled`
    /// once `cancel` fires. Callers never trust the result of a cancelled
    /// request either way.
    async fn search(
        &self,
        filters: &SearchFilters,
        cancel: &CancellationToken,
    ) -> Result<SearchResultPage>;

    /// Count-only estimate for the given filters
    async fn preview(&self, filters: &SearchFilters) -> Result<u64>;

    /// Current quota of the account
    async fn usage(&self) -> Result<UsageInfo>;
}
