//! Run lifecycle service: start, poll, cancel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use aivis_core::scoring::ScoringPolicy;
use aivis_core::CompanyProfile;
use aivis_serp::{CacheStore, MemoryStore, SerpClient};

use crate::pipeline::{
    run_company_analysis, AnalysisOutcome, CancelFlag, PipelineConfig, StageTracker,
};
use crate::types::{AnalysisScores, QueryFailure, RunStatus};

struct RunEntry {
    tracker: StageTracker,
    cancel: CancelFlag,
    outcome: Option<Arc<AnalysisOutcome>>,
    error: Option<String>,
}

/// Point-in-time view of a run, safe to hand to callers while the run is
/// still moving.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub scores: Option<AnalysisScores>,
    pub failures: Vec<QueryFailure>,
    pub error: Option<String>,
}

/// Owns the shared SERP client and the set of in-flight and finished runs.
///
/// Each `start_analysis` call spawns a detached task; callers poll with
/// [`SearchIntelligenceService::report`]. Finished runs stay queryable until
/// the service is dropped.
pub struct SearchIntelligenceService<S: CacheStore = MemoryStore> {
    client: Arc<SerpClient<S>>,
    policy: Arc<ScoringPolicy>,
    config: PipelineConfig,
    runs: Arc<Mutex<HashMap<Uuid, RunEntry>>>,
}

impl<S> SearchIntelligenceService<S>
where
    S: CacheStore + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(client: Arc<SerpClient<S>>, policy: ScoringPolicy, config: PipelineConfig) -> Self {
        Self {
            client,
            policy: Arc::new(policy),
            config,
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queue an analysis run for `company` and return its id immediately.
    pub fn start_analysis(&self, company: CompanyProfile) -> Uuid {
        let run_id = Uuid::new_v4();
        let tracker = StageTracker::default();
        let cancel = CancelFlag::default();

        self.lock_runs().insert(
            run_id,
            RunEntry {
                tracker: tracker.clone(),
                cancel: cancel.clone(),
                outcome: None,
                error: None,
            },
        );

        let client = Arc::clone(&self.client);
        let policy = Arc::clone(&self.policy);
        let config = self.config.clone();
        let runs = Arc::clone(&self.runs);
        tokio::spawn(async move {
            let result = run_company_analysis(
                client, run_id, &company, &policy, &config, &cancel, &tracker,
            )
            .await;

            let mut runs = runs.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(entry) = runs.get_mut(&run_id) else {
                return;
            };
            match result {
                Ok(outcome) => entry.outcome = Some(Arc::new(outcome)),
                Err(err) => entry.error = Some(err.to_string()),
            }
        });

        run_id
    }

    /// Current state of a run, or `None` for an unknown id.
    #[must_use]
    pub fn report(&self, run_id: Uuid) -> Option<RunReport> {
        let runs = self.lock_runs();
        let entry = runs.get(&run_id)?;
        Some(RunReport {
            run_id,
            status: entry.tracker.get(),
            scores: entry.outcome.as_ref().map(|o| o.scores.clone()),
            failures: entry
                .outcome
                .as_ref()
                .map(|o| o.failures.clone())
                .unwrap_or_default(),
            error: entry.error.clone(),
        })
    }

    /// Full outcome of a completed run.
    #[must_use]
    pub fn outcome(&self, run_id: Uuid) -> Option<Arc<AnalysisOutcome>> {
        self.lock_runs().get(&run_id).and_then(|e| e.outcome.clone())
    }

    /// Raise a run's cancel flag. Returns false for unknown or already
    /// terminal runs.
    pub fn cancel(&self, run_id: Uuid) -> bool {
        let runs = self.lock_runs();
        match runs.get(&run_id) {
            Some(entry) if !entry.tracker.get().is_terminal() => {
                entry.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    fn lock_runs(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, RunEntry>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
