//! Provider-order fetch with retry, fallback, budget, and cache write-through.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use aivis_core::AppConfig;

use crate::budget::{BudgetDecision, BudgetManager};
use crate::cache::{cache_key, CacheManager, CacheStore, MemoryStore};
use crate::error::{ProviderAttempt, SerpError};
use crate::parse::parse_response;
use crate::provider::{ProviderConfig, ProviderId};
use crate::retry::retry_with_backoff;
use crate::types::{RankingEntry, SearchParams, SerpResult};

/// A resolved fetch plus the providers that were tried and failed before
/// the winning one. Callers decide whether partial degradation matters.
#[derive(Debug)]
pub struct FetchOutcome {
    pub result: SerpResult,
    pub failed_attempts: Vec<ProviderAttempt>,
}

/// Client over the configured SERP providers.
///
/// Owns the budget ledger and response cache, so every fetch goes through
/// reservation and single-flight caching. One instance is meant to be
/// shared across all workers of an analysis run (and may be shared across
/// runs to pool budget and cache).
pub struct SerpClient<S: CacheStore = MemoryStore> {
    http: Client,
    providers: HashMap<ProviderId, ProviderConfig>,
    budget: BudgetManager,
    cache: CacheManager<S>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl SerpClient<MemoryStore> {
    /// Build a client with an in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`SerpError::NoProviders`] when `providers` is empty, or
    /// [`SerpError::Http`] if the HTTP client cannot be constructed.
    pub fn new(
        providers: Vec<ProviderConfig>,
        budget_window: Duration,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SerpError> {
        Self::with_store(
            providers,
            MemoryStore::default(),
            budget_window,
            timeout_secs,
            user_agent,
            max_retries,
            backoff_base_ms,
        )
    }

    /// Build a client from application config, enabling each provider whose
    /// API key is present.
    ///
    /// # Errors
    ///
    /// Returns [`SerpError::NoProviders`] when no provider key is
    /// configured, or [`SerpError::Http`] if the HTTP client cannot be
    /// constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SerpError> {
        let keyed = [
            (ProviderId::OpenAiSerp, config.openai_serp_api_key.as_ref()),
            (ProviderId::ValueSerp, config.value_serp_api_key.as_ref()),
            (ProviderId::ScaleSerp, config.scale_serp_api_key.as_ref()),
        ];

        let mut providers = Vec::new();
        for (id, api_key) in keyed {
            let Some(api_key) = api_key else { continue };
            let mut provider =
                ProviderConfig::new(id, api_key, ProviderConfig::default_base_url(id))?;
            provider.quota = config.budget_quota_credits;
            provider.cache_ttl = Duration::from_secs(config.serp_cache_ttl_secs);
            providers.push(provider);
        }

        Self::new(
            providers,
            Duration::from_secs(config.budget_window_secs),
            config.serp_request_timeout_secs,
            &config.serp_user_agent,
            config.serp_max_retries,
            config.serp_backoff_base_ms,
        )
    }
}

impl<S: CacheStore> SerpClient<S> {
    /// Build a client over an explicit cache store.
    ///
    /// # Errors
    ///
    /// Returns [`SerpError::NoProviders`] when `providers` is empty, or
    /// [`SerpError::Http`] if the HTTP client cannot be constructed.
    pub fn with_store(
        providers: Vec<ProviderConfig>,
        store: S,
        budget_window: Duration,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SerpError> {
        if providers.is_empty() {
            return Err(SerpError::NoProviders);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let budget = BudgetManager::new(
            budget_window,
            providers.iter().map(|p| (p.id, p.quota)),
        );
        let providers = providers.into_iter().map(|p| (p.id, p)).collect();

        Ok(Self {
            http,
            providers,
            budget,
            cache: CacheManager::new(store),
            max_retries,
            backoff_base_ms,
        })
    }

    #[must_use]
    pub fn budget(&self) -> &BudgetManager {
        &self.budget
    }

    /// Fetch a canonicalized result set for `query`, trying providers in
    /// budget order with retry and fallback.
    ///
    /// `requested` narrows the provider order without changing its ranking.
    ///
    /// # Errors
    ///
    /// - [`SerpError::NoProviders`] when the filtered order is empty.
    /// - [`SerpError::AllProvidersFailed`] when every provider was denied
    ///   or failed, carrying each attempt's reason.
    pub async fn fetch(
        &self,
        query: &str,
        params: &SearchParams,
        requested: Option<&[ProviderId]>,
    ) -> Result<FetchOutcome, SerpError> {
        let order: Vec<ProviderId> = self
            .budget
            .provider_order()
            .into_iter()
            .filter(|id| self.providers.contains_key(id))
            .filter(|id| requested.is_none_or(|r| r.contains(id)))
            .collect();
        if order.is_empty() {
            return Err(SerpError::NoProviders);
        }

        let mut attempts = Vec::new();
        for provider in order {
            let Some(config) = self.providers.get(&provider) else {
                continue;
            };
            match self.fetch_from_provider(config, query, params).await {
                Ok(result) => {
                    tracing::debug!(
                        provider = %provider,
                        query,
                        results = result.rankings.len(),
                        from_cache = result.from_cache,
                        "query resolved"
                    );
                    return Ok(FetchOutcome {
                        result,
                        failed_attempts: attempts,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %provider,
                        query,
                        error = %err,
                        "provider failed; falling through to next"
                    );
                    attempts.push(ProviderAttempt {
                        provider,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Err(SerpError::AllProvidersFailed {
            query: query.to_string(),
            attempts,
        })
    }

    /// One provider's cached-or-fetched result. The budget is only touched
    /// inside the cache flight, so cache hits and blocked concurrent
    /// callers never spend.
    async fn fetch_from_provider(
        &self,
        config: &ProviderConfig,
        query: &str,
        params: &SearchParams,
    ) -> Result<SerpResult, SerpError> {
        let key = cache_key(config.id, query, params);
        self.cache
            .get_or_fetch(&key, config.cache_ttl, || async {
                match self.budget.reserve(config.id, config.cost_per_call) {
                    BudgetDecision::Allow => {}
                    BudgetDecision::Deny(reason) => {
                        return Err(SerpError::BudgetExhausted {
                            provider: config.id,
                            reason,
                        });
                    }
                }

                let outcome = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                    self.attempt(config, query, params)
                })
                .await;

                match outcome {
                    Ok(rankings) => {
                        self.budget
                            .commit(config.id, config.cost_per_call, config.cost_per_call);
                        Ok(SerpResult {
                            request_key: key.as_str().to_string(),
                            provider: config.id,
                            rankings,
                            fetched_at: Utc::now(),
                            from_cache: false,
                        })
                    }
                    Err(err) => {
                        // Failed calls consume the attempt cost, not the
                        // success cost.
                        self.budget
                            .commit(config.id, config.cost_per_call, config.attempt_cost);
                        Err(err)
                    }
                }
            })
            .await
    }

    /// One raw HTTP attempt: send, classify status, parse body.
    async fn attempt(
        &self,
        config: &ProviderConfig,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<RankingEntry>, SerpError> {
        let url = self.build_search_url(config, query, params)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SerpError::Permanent {
                provider: config.id,
                reason: format!("HTTP {status}"),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(SerpError::Transient {
                provider: config.id,
                reason: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(SerpError::Permanent {
                provider: config.id,
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.text().await?;
        let raw: Value = serde_json::from_str(&body).map_err(|e| SerpError::Deserialize {
            context: format!("{}({query})", config.id),
            source: e,
        })?;

        Ok(parse_response(config.id, &raw))
    }

    /// Build the search URL with percent-encoded query parameters.
    fn build_search_url(
        &self,
        config: &ProviderConfig,
        query: &str,
        params: &SearchParams,
    ) -> Result<Url, SerpError> {
        let mut url = config
            .base_url
            .join(config.id.search_path())
            .map_err(|e| SerpError::Permanent {
                provider: config.id,
                reason: format!("invalid search path: {e}"),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &config.api_key);
            pairs.append_pair("q", query);
            for (k, v) in params.iter() {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}
