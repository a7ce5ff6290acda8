//! The closed set of paid SERP providers.
//!
//! Adding a provider is adding a variant here plus its branch in
//! [`crate::parse::parse_response`]; call sites iterate the budget
//! manager's provider order and never name providers directly.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::SerpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    OpenAiSerp,
    ValueSerp,
    ScaleSerp,
}

impl ProviderId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderId::OpenAiSerp => "openai_serp",
            ProviderId::ValueSerp => "value_serp",
            ProviderId::ScaleSerp => "scale_serp",
        }
    }

    /// Static fallback priority: cheapest first. Breaks ties when two
    /// providers have the same remaining-quota fraction.
    #[must_use]
    pub const fn static_priority(self) -> u8 {
        match self {
            ProviderId::ValueSerp => 0,
            ProviderId::ScaleSerp => 1,
            ProviderId::OpenAiSerp => 2,
        }
    }

    /// Path of the search endpoint relative to the provider base URL.
    #[must_use]
    pub const fn search_path(self) -> &'static str {
        match self {
            ProviderId::OpenAiSerp => "v1/search",
            ProviderId::ValueSerp | ProviderId::ScaleSerp => "search",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai_serp" => Ok(ProviderId::OpenAiSerp),
            "value_serp" => Ok(ProviderId::ValueSerp),
            "scale_serp" => Ok(ProviderId::ScaleSerp),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Per-provider configuration: auth, pricing, quota, and cache policy are
/// data, not logic.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub api_key: String,
    pub base_url: Url,
    /// Cost of a successful call, in credits (1 credit = 0.1¢).
    pub cost_per_call: u64,
    /// Cost consumed by a failed attempt.
    pub attempt_cost: u64,
    /// Rolling-window quota, in credits.
    pub quota: u64,
    /// How long a cached response for this provider stays fresh.
    pub cache_ttl: Duration,
}

impl ProviderConfig {
    /// Build a config with the provider's default pricing and endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SerpError::Permanent`] if `base_url` is not a valid URL.
    pub fn new(id: ProviderId, api_key: &str, base_url: &str) -> Result<Self, SerpError> {
        // Ensure exactly one trailing slash so Url::join keeps the full path.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| SerpError::Permanent {
            provider: id,
            reason: format!("invalid base URL '{base_url}': {e}"),
        })?;

        let (cost_per_call, attempt_cost) = match id {
            ProviderId::ValueSerp => (20, 5),
            ProviderId::ScaleSerp => (25, 5),
            ProviderId::OpenAiSerp => (40, 10),
        };

        Ok(Self {
            id,
            api_key: api_key.to_string(),
            base_url,
            cost_per_call,
            attempt_cost,
            quota: 5_000,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
        })
    }

    /// Production endpoint for a provider.
    #[must_use]
    pub const fn default_base_url(id: ProviderId) -> &'static str {
        match id {
            ProviderId::OpenAiSerp => "https://api.openai-serp.dev",
            ProviderId::ValueSerp => "https://api.valueserp.com",
            ProviderId::ScaleSerp => "https://api.scaleserp.com",
        }
    }
}
