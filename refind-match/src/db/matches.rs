//! Match database operations
//!
//! All writes go through the upsert keyed on the normalized unordered
//! pair; the `UNIQUE(report_a, report_b)` constraint makes concurrent
//! triggers for the same pair collapse into an update instead of a
//! duplicate row.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use refind_common::db::models::{Match, MatchStatus};
use refind_common::{Error, Result};

use super::reports::{parse_timestamp, parse_uuid};
use crate::engine::fusion::SignalBundle;

/// Map one matches row into a model
fn match_from_row(row: &SqliteRow) -> Result<Match> {
    let id: String = row.get("id");
    let report_a: String = row.get("report_a");
    let report_b: String = row.get("report_b");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Match {
        id: parse_uuid(&id, "id")?,
        report_a: parse_uuid(&report_a, "report_a")?,
        report_b: parse_uuid(&report_b, "report_b")?,
        score_total: row.get("score_total"),
        score_text: row.get("score_text"),
        score_image: row.get("score_image"),
        score_geo: row.get("score_geo"),
        score_time: row.get("score_time"),
        score_metadata: row.get("score_metadata"),
        status: MatchStatus::parse(&status)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

const MATCH_COLUMNS: &str = "id, report_a, report_b, score_total, score_text, score_image, \
     score_geo, score_time, score_metadata, status, created_at, updated_at";

/// Insert or refresh the match row for an admitted pair
///
/// Keyed on the normalized pair {min(a,b), max(a,b)}: a re-trigger
/// from either direction refreshes the scores and `updated_at` of the
/// existing row, preserving its id, status, and created_at. Returns
/// the stored row.
pub async fn upsert_match(
    pool: &SqlitePool,
    source_id: Uuid,
    candidate_id: Uuid,
    bundle: &SignalBundle,
    score_total: f64,
) -> Result<Match> {
    let (report_a, report_b) = Match::pair_key(source_id, candidate_id);
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO matches (
            id, report_a, report_b, score_total, score_text, score_image,
            score_geo, score_time, score_metadata, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'candidate', ?, ?)
        ON CONFLICT(report_a, report_b) DO UPDATE SET
            score_total = excluded.score_total,
            score_text = excluded.score_text,
            score_image = excluded.score_image,
            score_geo = excluded.score_geo,
            score_time = excluded.score_time,
            score_metadata = excluded.score_metadata,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(report_a.to_string())
    .bind(report_b.to_string())
    .bind(score_total)
    .bind(bundle.text)
    .bind(bundle.image)
    .bind(bundle.geo)
    .bind(bundle.time)
    .bind(bundle.metadata)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_by_pair(pool, report_a, report_b)
        .await?
        .ok_or_else(|| Error::Internal("Match row vanished after upsert".to_string()))
}

/// Load the match row for an unordered pair, if any
pub async fn get_by_pair(pool: &SqlitePool, a: Uuid, b: Uuid) -> Result<Option<Match>> {
    let (report_a, report_b) = Match::pair_key(a, b);

    let row = sqlx::query(&format!(
        "SELECT {} FROM matches WHERE report_a = ? AND report_b = ?",
        MATCH_COLUMNS
    ))
    .bind(report_a.to_string())
    .bind(report_b.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(match_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Load a match by id
pub async fn get_match(pool: &SqlitePool, id: Uuid) -> Result<Option<Match>> {
    let row = sqlx::query(&format!("SELECT {} FROM matches WHERE id = ?", MATCH_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(match_from_row(&row)?)),
        None => Ok(None),
    }
}

/// All matches touching a report, ranked by total score descending
/// with ties broken by the counterpart report's creation time (older
/// candidates first)
pub async fn list_for_report(pool: &SqlitePool, report_id: Uuid) -> Result<Vec<Match>> {
    let id = report_id.to_string();

    let rows = sqlx::query(
        r#"
        SELECT m.id, m.report_a, m.report_b, m.score_total, m.score_text,
               m.score_image, m.score_geo, m.score_time, m.score_metadata,
               m.status, m.created_at, m.updated_at
        FROM matches m
        JOIN reports r ON r.id = CASE WHEN m.report_a = ?1 THEN m.report_b ELSE m.report_a END
        WHERE m.report_a = ?1 OR m.report_b = ?1
        ORDER BY m.score_total DESC, r.created_at ASC, r.id ASC
        "#,
    )
    .bind(&id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(match_from_row).collect()
}

/// Move a match through its lifecycle (candidate → promoted /
/// suppressed / dismissed)
pub async fn set_match_status(pool: &SqlitePool, id: Uuid, status: MatchStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE matches SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Match counts by lifecycle status
pub async fn status_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query("SELECT status, COUNT(*) as n FROM matches GROUP BY status")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>("status"), row.get::<i64, _>("n")))
        .collect())
}

/// Administrative reset: delete every match row, touch no reports
pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM matches").execute(pool).await?;
    Ok(result.rows_affected())
}
