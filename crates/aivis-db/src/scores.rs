//! Database operations for `run_scores` and `platform_scores`.
//!
//! Scores are write-once per run: a `UNIQUE (run_id)` constraint (and
//! `UNIQUE (run_id, platform)` for platform rows) makes a second write fail
//! rather than silently overwrite history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `run_scores` table. Percent-scale values are stored as
/// `NUMERIC(5, 2)`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunScoresRow {
    pub id: i64,
    pub run_id: i64,
    pub company_slug: String,
    pub authority: Decimal,
    pub share_of_voice_pct: Decimal,
    pub share_of_voice_floored: bool,
    pub brand_mentions: i32,
    /// Per-competitor mention counts and shares.
    pub competitor_breakdown: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `platform_scores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformScoreRow {
    pub id: i64,
    pub run_id: i64,
    pub platform: String,
    pub score: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Inserts the run-level scores for a completed run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including the unique
/// violation raised by a second write for the same run.
pub async fn insert_run_scores(
    pool: &PgPool,
    run_id: i64,
    company_slug: &str,
    authority: Decimal,
    share_of_voice_pct: Decimal,
    share_of_voice_floored: bool,
    brand_mentions: i32,
    competitor_breakdown: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO run_scores \
             (run_id, company_slug, authority, share_of_voice_pct, \
              share_of_voice_floored, brand_mentions, competitor_breakdown) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(run_id)
    .bind(company_slug)
    .bind(authority)
    .bind(share_of_voice_pct)
    .bind(share_of_voice_floored)
    .bind(brand_mentions)
    .bind(Json(competitor_breakdown))
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches the run-level scores for a run.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run has no scores yet, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_run_scores(pool: &PgPool, run_id: i64) -> Result<RunScoresRow, DbError> {
    let row = sqlx::query_as::<_, RunScoresRow>(
        "SELECT id, run_id, company_slug, authority, share_of_voice_pct, \
                share_of_voice_floored, brand_mentions, competitor_breakdown, created_at \
         FROM run_scores \
         WHERE run_id = $1",
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Inserts one predicted-visibility row per platform for a run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn insert_platform_scores(
    pool: &PgPool,
    run_id: i64,
    scores: &[(String, Decimal)],
) -> Result<(), DbError> {
    for (platform, score) in scores {
        sqlx::query(
            "INSERT INTO platform_scores (run_id, platform, score) \
             VALUES ($1, $2, $3)",
        )
        .bind(run_id)
        .bind(platform)
        .bind(score)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Returns all platform scores for a run, ordered by platform name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_platform_scores(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<PlatformScoreRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformScoreRow>(
        "SELECT id, run_id, platform, score, created_at \
         FROM platform_scores \
         WHERE run_id = $1 \
         ORDER BY platform",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
