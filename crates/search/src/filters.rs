//! Filter state holder

use std::sync::Arc;

use industrydb_common::{FilterChange, SearchFilters};
use parking_lot::Mutex;

/// Result of applying a batch of filter changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterUpdate {
    pub filters: SearchFilters,
    /// Only the page moved; the result volume is unchanged
    pub page_only: bool,
}

/// Current search criteria. Pure state, no I/O.
#[derive(Clone)]
pub struct FilterState {
    current: Arc<Mutex<SearchFilters>>,
    page_size: u32,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            current: Arc::new(Mutex::new(SearchFilters::with_page_size(page_size))),
            page_size,
        }
    }

    pub fn get(&self) -> SearchFilters {
        self.current.lock().clone()
    }

    /// Merge changes into the current filters.
    ///
    /// Any change other than the page sends the search back to page 1.
    pub fn set<I>(&self, changes: I) -> FilterUpdate
    where
        I: IntoIterator<Item = FilterChange>,
    {
        let changes: Vec<FilterChange> = changes.into_iter().collect();
        let mut current = self.current.lock();
        let resets_page = current.apply(&changes);
        FilterUpdate {
            filters: current.clone(),
            page_only: !resets_page,
        }
    }

    /// Back to the defaults: no criteria, first page
    pub fn clear(&self) -> SearchFilters {
        let mut current = self.current.lock();
        *current = SearchFilters::with_page_size(self.page_size);
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = FilterState::new(20);
        let filters = state.get();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.limit, 20);
        assert!(!filters.is_meaningful());
    }

    #[test]
    fn test_city_change_resets_page() {
        let state = FilterState::new(20);
        state.set([FilterChange::Industry(Some("roofing".into()))]);
        state.set([FilterChange::Page(3)]);
        assert_eq!(state.get().page, 3);

        let update = state.set([FilterChange::City(Some("X".into()))]);
        assert!(!update.page_only);
        assert_eq!(update.filters.page, 1);
        assert_eq!(update.filters.industry.as_deref(), Some("roofing"));
    }

    #[test]
    fn test_page_change_leaves_other_fields() {
        let state = FilterState::new(20);
        state.set([
            FilterChange::Country(Some("DE".into())),
            FilterChange::HasEmail(Some(true)),
        ]);

        let update = state.set([FilterChange::Page(3)]);
        assert!(update.page_only);
        assert_eq!(update.filters.page, 3);
        assert_eq!(update.filters.country.as_deref(), Some("DE"));
        assert_eq!(update.filters.has_email, Some(true));
    }

    #[test]
    fn test_clear() {
        let state = FilterState::new(50);
        state.set([FilterChange::Verified(Some(true))]);
        state.set([FilterChange::Page(7)]);

        let cleared = state.clear();
        assert_eq!(cleared, SearchFilters::with_page_size(50));
        assert_eq!(state.get(), cleared);
    }
}
