//! Search Intelligence pipeline: probe-query generation, ranking analysis,
//! scoring, and per-run orchestration over the SERP fetch stack.

pub mod authority;
pub mod competitors;
pub mod error;
pub mod pipeline;
pub mod querygen;
pub mod ranking;
pub mod service;
pub mod types;
pub mod visibility;

pub use authority::BrandAuthorityScorer;
pub use competitors::CompetitorAnalyzer;
pub use error::IntelError;
pub use pipeline::{run_company_analysis, AnalysisOutcome, CancelFlag, PipelineConfig, StageTracker};
pub use querygen::QueryGenerator;
pub use ranking::RankingAnalyzer;
pub use service::{RunReport, SearchIntelligenceService};
pub use types::{
    AnalysisScores, BatchMetrics, CategoryMetrics, FetchedQuery, ProbeQuery, QueryFailure,
    RankingMetrics, RunStatus, ShareOfVoice,
};
pub use visibility::AiVisibilityPredictor;
