//! Database operations for `serp_snapshots`.
//!
//! One row per (run, query): the parsed rankings as JSONB plus enough
//! provenance to re-score without re-fetching.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `serp_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SerpSnapshotRow {
    pub id: i64,
    pub run_id: i64,
    pub company_slug: String,
    /// Cache key of the fetch that produced this snapshot.
    pub query_hash: String,
    pub query_text: String,
    pub category: String,
    pub provider: String,
    pub rankings: Json<serde_json::Value>,
    pub from_cache: bool,
    pub fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

const SNAPSHOT_COLUMNS: &str = "id, run_id, company_slug, query_hash, query_text, category, \
     provider, rankings, from_cache, fetched_at, created_at";

/// Inserts or replaces the snapshot for one query of a run.
///
/// Conflicts on `(company_slug, run_id, query_hash)` replace the payload,
/// so a retried run-step is idempotent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_serp_snapshot(
    pool: &PgPool,
    run_id: i64,
    company_slug: &str,
    query_hash: &str,
    query_text: &str,
    category: &str,
    provider: &str,
    rankings: &serde_json::Value,
    from_cache: bool,
    fetched_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO serp_snapshots \
             (run_id, company_slug, query_hash, query_text, category, provider, \
              rankings, from_cache, fetched_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (company_slug, run_id, query_hash) DO UPDATE SET \
             query_text = EXCLUDED.query_text, \
             category   = EXCLUDED.category, \
             provider   = EXCLUDED.provider, \
             rankings   = EXCLUDED.rankings, \
             from_cache = EXCLUDED.from_cache, \
             fetched_at = EXCLUDED.fetched_at",
    )
    .bind(run_id)
    .bind(company_slug)
    .bind(query_hash)
    .bind(query_text)
    .bind(category)
    .bind(provider)
    .bind(Json(rankings))
    .bind(from_cache)
    .bind(fetched_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns all snapshots for a run, in query-hash order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_serp_snapshots(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<SerpSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, SerpSnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM serp_snapshots \
         WHERE run_id = $1 \
         ORDER BY query_hash"
    ))
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
