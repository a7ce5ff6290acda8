//! One analysis run, end to end: generate, fetch, analyze, score.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use aivis_core::scoring::ScoringPolicy;
use aivis_core::CompanyProfile;
use aivis_serp::{CacheStore, ProviderId, SearchParams, SerpClient};

use crate::authority::BrandAuthorityScorer;
use crate::competitors::CompetitorAnalyzer;
use crate::error::IntelError;
use crate::querygen::QueryGenerator;
use crate::ranking::RankingAnalyzer;
use crate::types::{AnalysisScores, FetchedQuery, ProbeQuery, QueryFailure, RunStatus};
use crate::visibility::AiVisibilityPredictor;

/// Cooperative cancellation signal shared between a run and its owner.
/// Cancellation is observed between queries; an in-flight HTTP call is
/// allowed to finish so its response still lands in the cache.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared view of which stage a run is in. Writes only move forward.
#[derive(Debug, Clone, Default)]
pub struct StageTracker(Arc<Mutex<RunStatus>>);

impl StageTracker {
    pub fn set(&self, status: RunStatus) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    #[must_use]
    pub fn get(&self) -> RunStatus {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Concurrent fetch workers per run.
    pub concurrency: usize,
    /// Wall-clock bound on the fetch stage.
    pub run_timeout: Duration,
    /// Cap on generated queries per category.
    pub queries_per_category: usize,
    /// Narrow fetches to these providers; `None` uses the full budget order.
    pub providers: Option<Vec<ProviderId>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            run_timeout: Duration::from_secs(300),
            queries_per_category: 10,
            providers: None,
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub run_id: Uuid,
    pub company_slug: String,
    pub generated_queries: usize,
    pub fetched: Vec<FetchedQuery>,
    pub failures: Vec<QueryFailure>,
    pub scores: AnalysisScores,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Run the full analysis pipeline for one company.
///
/// Per-query fetch failures are collected, not fatal; scoring proceeds over
/// whatever succeeded. The run itself fails only when nothing can be scored
/// at all, the timeout elapses, or it is cancelled.
///
/// # Errors
///
/// - [`IntelError::NoQueries`] when generation produces an empty batch.
/// - [`IntelError::RunTimeout`] when the fetch stage outlives the
///   configured run timeout.
/// - [`IntelError::Cancelled`] when the cancel flag was raised.
/// - [`IntelError::AllQueriesFailed`] when every query failed.
pub async fn run_company_analysis<S>(
    client: Arc<SerpClient<S>>,
    run_id: Uuid,
    company: &CompanyProfile,
    policy: &ScoringPolicy,
    config: &PipelineConfig,
    cancel: &CancelFlag,
    tracker: &StageTracker,
) -> Result<AnalysisOutcome, IntelError>
where
    S: CacheStore + Send + Sync + 'static,
{
    let started_at = Utc::now();
    let slug = company.slug();
    tracing::info!(%run_id, company = %slug, "analysis run starting");

    tracker.set(RunStatus::Generating);
    let generator = QueryGenerator::new(
        policy.category_weights.clone(),
        config.queries_per_category,
    );
    let queries = generator.generate(company);
    if queries.is_empty() {
        tracker.set(RunStatus::Failed);
        return Err(IntelError::NoQueries(slug));
    }
    let generated_queries = queries.len();
    tracing::info!(%run_id, queries = generated_queries, "probe queries generated");

    tracker.set(RunStatus::Fetching);
    let (fetched, failures) = match tokio::time::timeout(
        config.run_timeout,
        fetch_batch(&client, queries, config, cancel),
    )
    .await
    {
        Ok(batch) => batch,
        Err(_) => {
            tracker.set(RunStatus::Failed);
            tracing::warn!(%run_id, timeout = ?config.run_timeout, "analysis run timed out");
            return Err(IntelError::RunTimeout(config.run_timeout));
        }
    };

    if cancel.is_cancelled() {
        tracker.set(RunStatus::Failed);
        tracing::info!(%run_id, "analysis run cancelled");
        return Err(IntelError::Cancelled);
    }
    if fetched.is_empty() {
        tracker.set(RunStatus::Failed);
        return Err(IntelError::AllQueriesFailed);
    }
    tracing::info!(
        %run_id,
        fetched = fetched.len(),
        failed = failures.len(),
        "fetch stage complete"
    );

    tracker.set(RunStatus::Analyzing);
    let batch = RankingAnalyzer::for_company(company).aggregate(&fetched);
    let sov = CompetitorAnalyzer::for_company(company, policy.share_of_voice.clone())
        .share_of_voice(&fetched);

    tracker.set(RunStatus::Scoring);
    let authority = BrandAuthorityScorer::new(
        policy.authority.clone(),
        policy.category_weights.clone(),
    )
    .score(&batch);
    let visibility = AiVisibilityPredictor::new(
        policy.platforms.clone(),
        policy.category_weights.clone(),
    )
    .predict(authority, &sov, &batch);

    tracker.set(RunStatus::Complete);
    let completed_at = Utc::now();
    tracing::info!(
        %run_id,
        authority,
        share_of_voice = sov.pct,
        "analysis run complete"
    );

    Ok(AnalysisOutcome {
        run_id,
        company_slug: slug,
        generated_queries,
        fetched,
        failures,
        scores: AnalysisScores {
            authority,
            share_of_voice: sov,
            visibility,
        },
        started_at,
        completed_at,
    })
}

enum FetchResult {
    Fetched(Box<FetchedQuery>),
    Failed(QueryFailure),
    Skipped,
}

/// Fetch the batch over a bounded worker pool.
///
/// Each fetch runs in its own task so an abandoned batch (run timeout)
/// leaves in-flight calls to finish and populate the cache for the next
/// run.
async fn fetch_batch<S>(
    client: &Arc<SerpClient<S>>,
    queries: Vec<ProbeQuery>,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> (Vec<FetchedQuery>, Vec<QueryFailure>)
where
    S: CacheStore + Send + Sync + 'static,
{
    let providers = config.providers.clone();
    let results = stream::iter(queries)
        .map(|query| {
            let client = Arc::clone(client);
            let cancel = cancel.clone();
            let providers = providers.clone();
            async move {
                if cancel.is_cancelled() {
                    return FetchResult::Skipped;
                }
                let probe = query.clone();
                let handle = tokio::spawn(async move {
                    let outcome = client
                        .fetch(&query.text, &SearchParams::new(), providers.as_deref())
                        .await;
                    (query, outcome)
                });
                match handle.await {
                    Ok((query, Ok(outcome))) => {
                        for attempt in &outcome.failed_attempts {
                            tracing::debug!(
                                query = %query.text,
                                provider = %attempt.provider,
                                reason = %attempt.reason,
                                "provider fell through before success"
                            );
                        }
                        FetchResult::Fetched(Box::new(FetchedQuery {
                            query,
                            result: outcome.result,
                        }))
                    }
                    Ok((query, Err(err))) => FetchResult::Failed(QueryFailure {
                        reason: err.to_string(),
                        query,
                    }),
                    Err(join_err) => {
                        tracing::error!(query = %probe.text, error = %join_err, "fetch task panicked");
                        FetchResult::Failed(QueryFailure {
                            reason: format!("fetch task failed: {join_err}"),
                            query: probe,
                        })
                    }
                }
            }
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut fetched = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            FetchResult::Fetched(item) => fetched.push(*item),
            FetchResult::Failed(failure) => failures.push(failure),
            FetchResult::Skipped => {}
        }
    }
    (fetched, failures)
}
