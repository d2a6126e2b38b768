//! Report database operations
//!
//! Report creation and moderation are owned by other services; the
//! match engine reads candidates and only writes reports through the
//! narrow insert/status helpers (used by seeding and tests).

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use refind_common::db::models::{Report, ReportStatus, ReportType};
use refind_common::db::{decode_string_list, encode_string_list};
use refind_common::{Error, Result};

/// Map one reports row into a model
pub(crate) fn report_from_row(row: &SqliteRow) -> Result<Report> {
    let id: String = row.get("id");
    let report_type: String = row.get("report_type");
    let status: String = row.get("status");
    let colors: String = row.get("colors");
    let image_refs: String = row.get("image_refs");
    let owner_id: String = row.get("owner_id");
    let occurred_at: String = row.get("occurred_at");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Report {
        id: parse_uuid(&id, "id")?,
        report_type: ReportType::parse(&report_type)?,
        status: ReportStatus::parse(&status)?,
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        colors: decode_string_list(&colors, "colors")?,
        occurred_at: parse_timestamp(&occurred_at, "occurred_at")?,
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        city: row.get("city"),
        image_refs: decode_string_list(&image_refs, "image_refs")?,
        owner_id: parse_uuid(&owner_id, "owner_id")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

pub(crate) fn parse_uuid(raw: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Bad {} uuid: {}", column, e)))
}

pub(crate) fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Bad {} timestamp: {}", column, e)))
}

const REPORT_COLUMNS: &str = "id, report_type, status, title, description, category, colors, \
     occurred_at, latitude, longitude, city, image_refs, owner_id, created_at, updated_at";

/// Load a single report by id
pub async fn get_report(pool: &SqlitePool, id: Uuid) -> Result<Option<Report>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM reports WHERE id = ?",
        REPORT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(report_from_row(&row)?)),
        None => Ok(None),
    }
}

/// All matchable (approved) reports of the given type, oldest first
pub async fn list_matchable(pool: &SqlitePool, report_type: ReportType) -> Result<Vec<Report>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM reports WHERE report_type = ? AND status = 'approved' ORDER BY created_at ASC",
        REPORT_COLUMNS
    ))
    .bind(report_type.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(report_from_row).collect()
}

/// Insert a report row
pub async fn insert_report(pool: &SqlitePool, report: &Report) -> Result<()> {
    let colors = encode_string_list(&report.colors)?;
    let image_refs = encode_string_list(&report.image_refs)?;

    sqlx::query(
        r#"
        INSERT INTO reports (
            id, report_type, status, title, description, category, colors,
            occurred_at, latitude, longitude, city, image_refs, owner_id,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report.id.to_string())
    .bind(report.report_type.as_str())
    .bind(report.status.as_str())
    .bind(&report.title)
    .bind(&report.description)
    .bind(&report.category)
    .bind(&colors)
    .bind(report.occurred_at.to_rfc3339())
    .bind(report.latitude)
    .bind(report.longitude)
    .bind(&report.city)
    .bind(&image_refs)
    .bind(report.owner_id.to_string())
    .bind(report.created_at.to_rfc3339())
    .bind(report.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Update a report's moderation status
pub async fn set_report_status(pool: &SqlitePool, id: Uuid, status: ReportStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE reports SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a report; match rows cascade
pub async fn delete_report(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Report counts for the status endpoint: (total, matchable lost, matchable found)
pub async fn report_counts(pool: &SqlitePool) -> Result<(i64, i64, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
        .fetch_one(pool)
        .await?;
    let lost: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reports WHERE report_type = 'lost' AND status = 'approved'",
    )
    .fetch_one(pool)
    .await?;
    let found: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reports WHERE report_type = 'found' AND status = 'approved'",
    )
    .fetch_one(pool)
    .await?;

    Ok((total, lost, found))
}
