//! Report command handler: recent runs and their scores for one company.

use aivis_db::DbError;

/// Print the most recent runs for `company_slug`, newest first, with scores
/// where the run completed.
///
/// # Errors
///
/// Returns an error if any query fails. A run without scores (failed or
/// still in flight) is printed without a score block.
pub(crate) async fn run_report(
    pool: &sqlx::PgPool,
    company_slug: &str,
    limit: i64,
) -> anyhow::Result<()> {
    let runs = aivis_db::list_analysis_runs(pool, company_slug, limit).await?;
    if runs.is_empty() {
        println!("no analysis runs for '{company_slug}'");
        return Ok(());
    }

    for run in &runs {
        println!(
            "{} {} [{}] generated={} fetched={} failed={}",
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.public_id,
            run.status,
            run.queries_generated,
            run.queries_fetched,
            run.queries_failed
        );
        if let Some(error) = &run.error_message {
            println!("    error: {error}");
        }

        match aivis_db::get_run_scores(pool, run.id).await {
            Ok(scores) => {
                println!(
                    "    authority {} | share of voice {}%{}",
                    scores.authority,
                    scores.share_of_voice_pct,
                    if scores.share_of_voice_floored {
                        " (floored)"
                    } else {
                        ""
                    }
                );
                for platform in aivis_db::list_platform_scores(pool, run.id).await? {
                    println!("    {:<12} {}", platform.platform, platform.score);
                }
            }
            Err(DbError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
