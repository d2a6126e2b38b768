//! Database access for Refind services
//!
//! Shared SQLite database holding reports and their matches.

pub mod models;

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Encode a string list into its TEXT column form (JSON array)
pub fn encode_string_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| Error::Internal(format!("Failed to serialize list: {}", e)))
}

/// Decode a TEXT column JSON array back into a string list
pub fn decode_string_list(raw: &str, column: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

/// Initialize database connection pool
///
/// Connects to refind.db at the given path, creating the file and any
/// missing tables on first run. Foreign key enforcement is enabled on
/// every connection: match rows cascade when a report is deleted.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create an in-memory pool with the full schema (test support)
///
/// Pinned to a single connection: every pooled connection to
/// `:memory:` would otherwise see its own empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Initialize tables and the unordered-pair uniqueness constraint
///
/// Match rows reference reports with ON DELETE CASCADE so deleting a
/// report invalidates its matches; `UNIQUE(report_a, report_b)` on the
/// normalized pair is the duplicate guard for concurrent triggers.
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            report_type TEXT NOT NULL CHECK (report_type IN ('lost', 'found')),
            status TEXT NOT NULL DEFAULT 'pending',
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            colors TEXT NOT NULL DEFAULT '[]',
            occurred_at TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            city TEXT,
            image_refs TEXT NOT NULL DEFAULT '[]',
            owner_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            report_a TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
            report_b TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
            score_total REAL NOT NULL,
            score_text REAL NOT NULL,
            score_image REAL,
            score_geo REAL NOT NULL,
            score_time REAL NOT NULL,
            score_metadata REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'candidate',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (report_a, report_b)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_type_status ON reports(report_type, status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_report_a ON matches(report_a)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_report_b ON matches(report_b)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (reports, matches)");

    Ok(())
}
