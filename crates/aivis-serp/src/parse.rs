//! Normalization of raw provider responses into canonical ranking lists.
//!
//! Each provider has its own raw schema; every branch renumbers positions
//! to a contiguous 1-based run and drops partially malformed entries with a
//! warning rather than aborting the rest.

use serde_json::Value;

use crate::provider::ProviderId;
use crate::types::RankingEntry;

/// Parse a provider's raw JSON response into an ordered ranking list.
///
/// A response without the expected results array parses as an empty list —
/// providers omit the key when a query has no organic results.
#[must_use]
pub fn parse_response(provider: ProviderId, raw: &Value) -> Vec<RankingEntry> {
    let items = match provider {
        ProviderId::OpenAiSerp => raw.get("results"),
        ProviderId::ValueSerp | ProviderId::ScaleSerp => raw.get("organic_results"),
    };
    let Some(items) = items.and_then(Value::as_array) else {
        tracing::debug!(provider = %provider, "response carries no results array");
        return Vec::new();
    };

    let entries: Vec<RankingEntry> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            parse_entry(provider, item).or_else(|| {
                tracing::warn!(
                    provider = %provider,
                    index = idx,
                    "skipping malformed ranking entry"
                );
                None
            })
        })
        .collect();

    // Positions are assigned by normalized order, not provider-native
    // numbering, so the invariant (contiguous, 1-based, unique) holds even
    // for 0-indexed or gappy providers.
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, mut entry)| {
            #[allow(clippy::cast_possible_truncation)]
            let position = (idx + 1) as u32;
            entry.position = position;
            entry
        })
        .collect()
}

fn parse_entry(provider: ProviderId, item: &Value) -> Option<RankingEntry> {
    let url_field = match provider {
        ProviderId::OpenAiSerp => "url",
        ProviderId::ValueSerp | ProviderId::ScaleSerp => "link",
    };
    let url = item.get(url_field)?.as_str()?.to_string();
    if url.is_empty() {
        return None;
    }

    let domain = item
        .get("domain")
        .and_then(Value::as_str)
        .map_or_else(|| domain_from_url(&url), ToString::to_string);

    let text = |field: &str| {
        item.get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(RankingEntry {
        position: 0, // renumbered by the caller
        url,
        domain,
        title: text("title"),
        snippet: text("snippet"),
    })
}

/// Extract the host from a URL, with any `www.` prefix stripped.
#[must_use]
pub fn domain_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
        .map(|host| host.trim_start_matches("www.").to_string())
        .unwrap_or_default()
}
