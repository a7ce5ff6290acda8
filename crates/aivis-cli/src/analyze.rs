//! Analysis command handlers for the CLI.
//!
//! These are called from `main` after config (and, for a live run, the
//! database pool) are established. Per-query fetch failures inside a run are
//! reported in the summary, not propagated; run-level failures mark the run
//! row failed and then propagate.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use aivis_core::company::{load_companies, CompanyProfile};
use aivis_core::scoring::ScoringPolicy;
use aivis_core::AppConfig;
use aivis_intel::{
    run_company_analysis, AnalysisOutcome, CancelFlag, PipelineConfig, QueryGenerator,
    StageTracker,
};
use aivis_serp::{ProviderId, SerpClient};

fn load_company(config: &AppConfig, slug: &str) -> anyhow::Result<CompanyProfile> {
    let companies = load_companies(&config.companies_path)?;
    companies
        .find(slug)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("company '{slug}' not found in {}", config.companies_path.display()))
}

fn pipeline_config(config: &AppConfig, providers: Vec<ProviderId>) -> PipelineConfig {
    PipelineConfig {
        concurrency: config.fetch_concurrency,
        run_timeout: std::time::Duration::from_secs(config.run_timeout_secs),
        queries_per_category: config.queries_per_category,
        providers: if providers.is_empty() {
            None
        } else {
            Some(providers)
        },
    }
}

/// Print the probe queries an analysis run would fetch, without fetching.
///
/// # Errors
///
/// Returns an error if config files cannot be loaded or the slug is unknown.
pub(crate) fn print_queries(config: &AppConfig, slug: &str) -> anyhow::Result<()> {
    let company = load_company(config, slug)?;
    let policy = ScoringPolicy::load_or_default(&config.scoring_path)?;
    let generator = QueryGenerator::new(policy.category_weights, config.queries_per_category);
    let queries = generator.generate(&company);

    println!("{} probe queries for '{slug}':", queries.len());
    for query in &queries {
        println!("  [{:>2}] {:<16} {}", query.priority, query.category.to_string(), query.text);
    }

    Ok(())
}

/// Run a full analysis for one company and persist snapshots and scores.
///
/// # Errors
///
/// Returns an error if config loading, client construction, persistence, or
/// the run itself fails. A failed run is recorded on its `analysis_runs` row
/// before the error propagates.
pub(crate) async fn run_analyze(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    slug: &str,
    providers: Vec<ProviderId>,
) -> anyhow::Result<()> {
    let company = load_company(config, slug)?;
    let policy = ScoringPolicy::load_or_default(&config.scoring_path)?;
    let client = SerpClient::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build SERP client: {e}"))?;

    let run_id = Uuid::new_v4();
    let row = aivis_db::create_analysis_run(pool, run_id, slug).await?;
    aivis_db::start_analysis_run(pool, row.id).await?;

    let result = run_company_analysis(
        Arc::new(client),
        run_id,
        &company,
        &policy,
        &pipeline_config(config, providers),
        &CancelFlag::default(),
        &StageTracker::default(),
    )
    .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            aivis_db::fail_analysis_run(pool, row.id, &err.to_string()).await?;
            return Err(err.into());
        }
    };

    persist_outcome(pool, row.id, &outcome).await?;
    print_summary(&outcome);

    Ok(())
}

async fn persist_outcome(
    pool: &sqlx::PgPool,
    run_row_id: i64,
    outcome: &AnalysisOutcome,
) -> anyhow::Result<()> {
    for item in &outcome.fetched {
        let rankings = serde_json::to_value(&item.result.rankings)?;
        aivis_db::upsert_serp_snapshot(
            pool,
            run_row_id,
            &outcome.company_slug,
            &item.result.request_key,
            &item.query.text,
            item.query.category.as_str(),
            item.result.provider.as_str(),
            &rankings,
            item.result.from_cache,
            item.result.fetched_at,
        )
        .await?;
    }

    let scores = &outcome.scores;
    let breakdown = serde_json::json!({
        "mentions": scores.share_of_voice.competitor_mentions,
        "pct": scores.share_of_voice.competitor_pct,
    });
    aivis_db::insert_run_scores(
        pool,
        run_row_id,
        &outcome.company_slug,
        percent(scores.authority),
        percent(scores.share_of_voice.pct),
        scores.share_of_voice.floored,
        i32::try_from(scores.share_of_voice.brand_mentions).unwrap_or(i32::MAX),
        &breakdown,
    )
    .await?;

    let platform_scores: Vec<(String, Decimal)> = scores
        .visibility
        .iter()
        .map(|(platform, score)| (platform.clone(), percent(*score)))
        .collect();
    aivis_db::insert_platform_scores(pool, run_row_id, &platform_scores).await?;

    aivis_db::complete_analysis_run(
        pool,
        run_row_id,
        i32::try_from(outcome.generated_queries).unwrap_or(i32::MAX),
        i32::try_from(outcome.fetched.len()).unwrap_or(i32::MAX),
        i32::try_from(outcome.failures.len()).unwrap_or(i32::MAX),
    )
    .await?;

    Ok(())
}

fn percent(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

fn print_summary(outcome: &AnalysisOutcome) {
    println!(
        "run {} complete: {}/{} queries fetched ({} failed)",
        outcome.run_id,
        outcome.fetched.len(),
        outcome.generated_queries,
        outcome.failures.len()
    );
    println!("  authority:      {:>6.2}", outcome.scores.authority);
    println!(
        "  share of voice: {:>6.2}%{}",
        outcome.scores.share_of_voice.pct,
        if outcome.scores.share_of_voice.floored {
            " (floored)"
        } else {
            ""
        }
    );
    for (platform, score) in &outcome.scores.visibility {
        println!("  {platform:<14}  {score:>6.2}");
    }
    for failure in &outcome.failures {
        tracing::warn!(query = %failure.query.text, reason = %failure.reason, "query failed");
    }
}
