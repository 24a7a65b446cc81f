//! Core types for IndustryDB

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of leads per result page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Search criteria for the leads endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_phone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    pub page: u32,
    pub limit: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl SearchFilters {
    /// Empty filters on the first page
    pub fn with_page_size(limit: u32) -> Self {
        Self {
            industry: None,
            country: None,
            city: None,
            has_email: None,
            has_phone: None,
            verified: None,
            page: 1,
            limit,
        }
    }

    /// Whether any filter worth previewing is set.
    ///
    /// `city` only narrows a country and does not count on its own.
    pub fn is_meaningful(&self) -> bool {
        self.industry.is_some()
            || self.country.is_some()
            || self.has_email.is_some()
            || self.has_phone.is_some()
            || self.verified.is_some()
    }

    /// Apply a batch of changes, enforcing the page reset rule.
    ///
    /// Returns true when anything other than the page was touched.
    pub fn apply(&mut self, changes: &[FilterChange]) -> bool {
        let mut resets_page = false;
        for change in changes {
            match change {
                FilterChange::Industry(v) => self.industry = normalize(v),
                FilterChange::Country(v) => self.country = normalize(v),
                FilterChange::City(v) => self.city = normalize(v),
                FilterChange::HasEmail(v) => self.has_email = *v,
                FilterChange::HasPhone(v) => self.has_phone = *v,
                FilterChange::Verified(v) => self.verified = *v,
                FilterChange::Page(p) => self.page = (*p).max(1),
            }
            resets_page |= !matches!(change, FilterChange::Page(_));
        }
        if resets_page {
            self.page = 1;
        }
        resets_page
    }

    /// Query-string pairs for the search endpoint
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.industry {
            pairs.push(("industry", v.clone()));
        }
        if let Some(v) = &self.country {
            pairs.push(("country", v.clone()));
        }
        if let Some(v) = &self.city {
            pairs.push(("city", v.clone()));
        }
        if let Some(v) = self.has_email {
            pairs.push(("has_email", v.to_string()));
        }
        if let Some(v) = self.has_phone {
            pairs.push(("has_phone", v.to_string()));
        }
        if let Some(v) = self.verified {
            pairs.push(("verified", v.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

fn normalize(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A single filter edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Industry(Option<String>),
    Country(Option<String>),
    City(Option<String>),
    HasEmail(Option<bool>),
    HasPhone(Option<bool>),
    Verified(Option<bool>),
    Page(u32),
}

/// A business lead as returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    #[serde(alias = "name")]
    pub company_name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub quality_score: Option<u8>,
}

/// Pagination metadata of a result page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Realized search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub items: Vec<Lead>,
    pub pagination: Pagination,
}

/// Count estimate for one filter snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewResult {
    pub estimated_count: u64,
    pub computed_for: SearchFilters,
    pub computed_at: DateTime<Utc>,
}

/// Account quota snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub remaining: u64,
    pub limit: u64,
    pub used: u64,
    pub tier: String,
}

impl UsageInfo {
    /// Low enough to ask before spending quota, but not exhausted
    pub fn is_low(&self, threshold: u64) -> bool {
        self.remaining > 0 && self.remaining <= threshold
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

impl From<UsageResponse> for UsageInfo {
    fn from(r: UsageResponse) -> Self {
        Self {
            remaining: r.remaining,
            limit: r.usage_limit,
            used: r.current_usage,
            tier: r.tier,
        }
    }
}

/// User-facing notice left behind by a failed search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Notice {
    RateLimited,
    UpgradeRequired,
    AuthRequired { login_url: String },
    Invalid(String),
    Retryable(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::RateLimited => write!(f, "Too many requests, please wait a moment and try again"),
            Notice::UpgradeRequired => {
                write!(f, "You have reached your usage limit, upgrade your plan to continue")
            }
            Notice::AuthRequired { login_url } => {
                write!(f, "Your session has expired, please sign in again at {}", login_url)
            }
            Notice::Invalid(msg) => write!(f, "{}", msg),
            Notice::Retryable(msg) => write!(f, "Search failed: {}. Please try again", msg),
        }
    }
}

// Wire format

/// Response of the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(alias = "data", alias = "leads")]
    pub items: Vec<Lead>,
    pub pagination: Pagination,
}

impl From<SearchResponse> for SearchResultPage {
    fn from(r: SearchResponse) -> Self {
        Self {
            items: r.items,
            pagination: r.pagination,
        }
    }
}

/// Body of the preview endpoint; pagination does not apply to a count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_phone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl From<&SearchFilters> for PreviewRequest {
    fn from(f: &SearchFilters) -> Self {
        Self {
            industry: f.industry.clone(),
            country: f.country.clone(),
            city: f.city.clone(),
            has_email: f.has_email,
            has_phone: f.has_phone,
            verified: f.verified,
        }
    }
}

/// Response of the preview endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(alias = "estimatedCount", alias = "count")]
    pub estimated_count: u64,
}

/// Response of the usage endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResponse {
    pub current_usage: u64,
    pub usage_limit: u64,
    pub remaining: u64,
    #[serde(default)]
    pub tier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_change_resets_page() {
        let mut filters = SearchFilters { page: 3, ..Default::default() };
        assert!(filters.apply(&[FilterChange::City(Some("X".into()))]));
        assert_eq!(filters.page, 1);
        assert_eq!(filters.city.as_deref(), Some("X"));
    }

    #[test]
    fn test_page_only_change_keeps_filters() {
        let mut filters = SearchFilters {
            industry: Some("dental".into()),
            ..Default::default()
        };
        assert!(!filters.apply(&[FilterChange::Page(3)]));
        assert_eq!(filters.page, 3);
        assert_eq!(filters.industry.as_deref(), Some("dental"));
    }

    #[test]
    fn test_mixed_batch_forces_first_page() {
        let mut filters = SearchFilters::default();
        filters.apply(&[FilterChange::Page(4), FilterChange::Country(Some("NL".into()))]);
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn test_blank_strings_clear_fields() {
        let mut filters = SearchFilters::default();
        filters.apply(&[FilterChange::Industry(Some("  ".into()))]);
        assert!(filters.industry.is_none());
        filters.apply(&[FilterChange::Industry(Some(" plumbing ".into()))]);
        assert_eq!(filters.industry.as_deref(), Some("plumbing"));
    }

    #[test]
    fn test_meaningful_filters() {
        let mut filters = SearchFilters::default();
        assert!(!filters.is_meaningful());
        filters.city = Some("Berlin".into());
        assert!(!filters.is_meaningful());
        filters.has_email = Some(true);
        assert!(filters.is_meaningful());
    }

    #[test]
    fn test_usage_thresholds() {
        let usage = |remaining| UsageInfo {
            remaining,
            limit: 100,
            used: 100 - remaining,
            tier: "free".into(),
        };
        assert!(usage(5).is_low(10));
        assert!(usage(10).is_low(10));
        assert!(!usage(11).is_low(10));
        assert!(!usage(0).is_low(10));
        assert!(usage(0).is_exhausted());
    }

    #[test]
    fn test_search_response_aliases() {
        let json = r#"{
            "data": [{"id": 1, "name": "Acme", "verified": true}],
            "pagination": {"total": 1, "total_pages": 1, "has_next": false, "has_prev": false}
        }"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items[0].company_name, "Acme");
        assert!(resp.items[0].verified);

        let preview: PreviewResponse = serde_json::from_str(r#"{"estimatedCount": 42}"#).unwrap();
        assert_eq!(preview.estimated_count, 42);
    }

    #[test]
    fn test_query_pairs() {
        let filters = SearchFilters {
            industry: Some("dental".into()),
            verified: Some(true),
            page: 2,
            ..Default::default()
        };
        let pairs = filters.query_pairs();
        assert!(pairs.contains(&("industry", "dental".to_string())));
        assert!(pairs.contains(&("verified", "true".to_string())));
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "country"));
    }
}
