//! Paid SERP-provider fetch stack: provider clients, response parsing,
//! budget enforcement, and a single-flight response cache.

pub mod budget;
pub mod cache;
pub mod client;
pub mod error;
pub mod parse;
pub mod provider;
mod retry;
pub mod types;

pub use budget::{BudgetDecision, BudgetManager};
pub use cache::{cache_key, CacheEntry, CacheKey, CacheManager, CacheStore, MemoryStore};
pub use client::{FetchOutcome, SerpClient};
pub use error::{CacheStoreError, ProviderAttempt, SerpError};
pub use parse::parse_response;
pub use provider::{ProviderConfig, ProviderId};
pub use types::{normalize_query, RankingEntry, SearchParams, SerpResult};
