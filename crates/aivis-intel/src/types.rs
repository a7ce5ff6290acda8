use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aivis_core::QueryCategory;
use aivis_serp::SerpResult;

/// One generated probe query. Immutable once generated; a new analysis run
/// regenerates the whole batch rather than mutating queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeQuery {
    pub id: Uuid,
    pub company_slug: String,
    pub text: String,
    pub category: QueryCategory,
    /// 0..=10, derived from the category weight table.
    pub priority: u8,
}

/// A query that reached a successful terminal state, with its result.
#[derive(Debug, Clone)]
pub struct FetchedQuery {
    pub query: ProbeQuery,
    pub result: SerpResult,
}

/// A query that reached a failed terminal state. Excluded from scoring.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub query: ProbeQuery,
    pub reason: String,
}

/// Brand-presence metrics for a single result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingMetrics {
    /// Entries matching the brand by domain or name.
    pub mentions: u32,
    /// Lowest-numbered matching position, if any.
    pub best_position: Option<u32>,
    /// Entries whose domain is the brand's own (a strict subset of mentions).
    pub citations: u32,
}

/// Per-category slice of a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryMetrics {
    pub queries: usize,
    pub queries_with_mention: usize,
}

impl CategoryMetrics {
    #[must_use]
    pub fn mention_rate(&self) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.queries_with_mention as f64 / self.queries as f64;
        rate
    }
}

/// Aggregated metrics across one analysis run's query batch.
#[derive(Debug, Clone, Default)]
pub struct BatchMetrics {
    pub query_count: usize,
    pub queries_with_mention: usize,
    pub total_mentions: u32,
    pub total_citations: u32,
    /// Mean best position over queries that had a mention at all.
    pub avg_best_position: Option<f64>,
    pub by_category: BTreeMap<QueryCategory, CategoryMetrics>,
}

impl BatchMetrics {
    #[must_use]
    pub fn mention_rate(&self) -> f64 {
        if self.query_count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.queries_with_mention as f64 / self.query_count as f64;
        rate
    }
}

/// Share of mention volume relative to the configured competitor set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareOfVoice {
    /// Focal brand share, percent, clamped to the policy floor.
    pub pct: f64,
    pub brand_mentions: u32,
    /// Mentions and unclamped share per competitor name.
    pub competitor_mentions: BTreeMap<String, u32>,
    pub competitor_pct: BTreeMap<String, f64>,
    /// True when the floor clamp changed the reported share.
    pub floored: bool,
}

/// The scores one analysis run produces; write-once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisScores {
    /// Brand authority in [0, 100].
    pub authority: f64,
    pub share_of_voice: ShareOfVoice,
    /// Predicted visibility per AI platform, each in [0, 100].
    pub visibility: BTreeMap<String, f64>,
}

/// Lifecycle of one analysis run. Only moves forward; `Failed` is terminal
/// and a failed run restarts from `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Queued,
    Generating,
    Fetching,
    Analyzing,
    Scoring,
    Complete,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Generating => "generating",
            RunStatus::Fetching => "fetching",
            RunStatus::Analyzing => "analyzing",
            RunStatus::Scoring => "scoring",
            RunStatus::Complete => "complete",
            RunStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
