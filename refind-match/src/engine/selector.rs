//! Candidate selection
//!
//! Narrows the search space before signal computation: all approved
//! reports of the opposite type. No further pre-filter is applied:
//! with weight redistribution in play no single-signal bound is
//! provably wider than the admission cutoff for every configuration,
//! so every opposite-type candidate is scored.

use sqlx::SqlitePool;

use refind_common::db::models::Report;
use refind_common::Result;

use crate::db::reports;

/// All candidates for a source report, read-only
///
/// An ineligible source (pending, hidden, removed) yields an empty
/// set, not an error. The source itself can never appear in the
/// result since candidates have the opposite type.
pub async fn select_candidates(pool: &SqlitePool, source: &Report) -> Result<Vec<Report>> {
    if !source.is_matchable() {
        tracing::debug!(
            report_id = %source.id,
            status = source.status.as_str(),
            "Source report not eligible for matching"
        );
        return Ok(Vec::new());
    }

    reports::list_matchable(pool, source.report_type.opposite()).await
}
