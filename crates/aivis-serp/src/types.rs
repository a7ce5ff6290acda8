use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Extra request parameters, kept sorted so two requests with the same
/// parameter set canonicalize to the same cache/budget key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams(BTreeMap<String, String>);

impl SearchParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical `k=v&k=v` form in sorted key order, for key derivation.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Normalize query text for key derivation: lowercase, whitespace collapsed.
#[must_use]
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One organic search result, position 1-based and unique within its set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub position: u32,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub snippet: String,
}

/// A canonicalized provider response.
///
/// An empty `rankings` sequence is a valid result (no results found) and is
/// distinct from a failed fetch, which produces no `SerpResult` at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpResult {
    pub request_key: String,
    pub provider: ProviderId,
    pub rankings: Vec<RankingEntry>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_query_collapses_whitespace_and_case() {
        assert_eq!(normalize_query("  Best   CRM\ttools "), "best crm tools");
    }

    #[test]
    fn params_canonical_is_sorted() {
        let params = SearchParams::new().with("num", "10").with("gl", "us");
        assert_eq!(params.canonical(), "gl=us&num=10");
    }

    #[test]
    fn identical_params_canonicalize_identically() {
        let a = SearchParams::new().with("gl", "us").with("num", "10");
        let b = SearchParams::new().with("num", "10").with("gl", "us");
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn serp_result_round_trips_in_order() {
        let result = SerpResult {
            request_key: "abc".to_string(),
            provider: ProviderId::ValueSerp,
            rankings: (1..=5)
                .map(|i| RankingEntry {
                    position: i,
                    url: format!("https://example.com/{i}"),
                    domain: "example.com".to_string(),
                    title: format!("result {i}"),
                    snippet: String::new(),
                })
                .collect(),
            fetched_at: Utc::now(),
            from_cache: false,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: SerpResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rankings, result.rankings);
    }
}
