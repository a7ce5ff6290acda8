use std::path::PathBuf;

/// Application configuration resolved from environment variables.
///
/// Secrets are redacted from the `Debug` output so the config can be logged
/// at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub companies_path: PathBuf,
    pub scoring_path: PathBuf,

    pub openai_serp_api_key: Option<String>,
    pub value_serp_api_key: Option<String>,
    pub scale_serp_api_key: Option<String>,

    pub serp_request_timeout_secs: u64,
    pub serp_max_retries: u32,
    pub serp_backoff_base_ms: u64,
    pub serp_cache_ttl_secs: u64,
    pub serp_user_agent: String,

    /// Rolling-window quota per provider, in credits (1 credit = 0.1¢).
    pub budget_quota_credits: u64,
    pub budget_window_secs: u64,

    pub fetch_concurrency: usize,
    pub run_timeout_secs: u64,
    pub queries_per_category: usize,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("companies_path", &self.companies_path)
            .field("scoring_path", &self.scoring_path)
            .field(
                "openai_serp_api_key",
                &self.openai_serp_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "value_serp_api_key",
                &self.value_serp_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "scale_serp_api_key",
                &self.scale_serp_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("serp_request_timeout_secs", &self.serp_request_timeout_secs)
            .field("serp_max_retries", &self.serp_max_retries)
            .field("serp_backoff_base_ms", &self.serp_backoff_base_ms)
            .field("serp_cache_ttl_secs", &self.serp_cache_ttl_secs)
            .field("serp_user_agent", &self.serp_user_agent)
            .field("budget_quota_credits", &self.budget_quota_credits)
            .field("budget_window_secs", &self.budget_window_secs)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .field("queries_per_category", &self.queries_per_category)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
