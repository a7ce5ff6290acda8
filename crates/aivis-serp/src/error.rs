use thiserror::Error;

use crate::provider::ProviderId;

/// One failed attempt against a provider, recorded so callers see every
/// contributing cause instead of a bare error.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: ProviderId,
    pub reason: String,
}

/// Errors produced by the SERP fetch stack.
#[derive(Debug, Error)]
pub enum SerpError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Retryable provider failure: 429, 5xx, or a malformed body that is
    /// usually a truncated response from an overloaded upstream.
    #[error("{provider} transient error: {reason}")]
    Transient {
        provider: ProviderId,
        reason: String,
    },

    /// Non-retryable provider failure (e.g. auth rejection). Fails that
    /// provider for the remainder of the run.
    #[error("{provider} permanent error: {reason}")]
    Permanent {
        provider: ProviderId,
        reason: String,
    },

    /// The budget ledger denied the reservation. Fatal for this provider,
    /// non-fatal for the query while fallback providers remain.
    #[error("{provider} budget exhausted: {reason}")]
    BudgetExhausted {
        provider: ProviderId,
        reason: String,
    },

    /// The response body could not be deserialized as JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No provider is both configured and requested for this fetch.
    #[error("no SERP providers configured or requested")]
    NoProviders,

    /// Every provider in the fallback order was exhausted or failed.
    #[error("all providers exhausted or failed for '{query}': [{}]", summarize(attempts))]
    AllProvidersFailed {
        query: String,
        attempts: Vec<ProviderAttempt>,
    },
}

fn summarize(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.provider, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of the cache backing store. Never fatal to a fetch; the caller
/// degrades to a direct provider call.
#[derive(Debug, Error)]
#[error("cache store unavailable: {0}")]
pub struct CacheStoreError(pub String);
