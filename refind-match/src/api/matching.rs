//! Matching trigger API handlers
//!
//! POST /matching/trigger/{report_id}, POST /matching/trigger-all,
//! GET /matching/status, POST /matching/clear, and the match
//! lifecycle transition endpoint.

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use refind_common::db::models::{Match, MatchStatus, ReportType};

use crate::error::{ApiError, ApiResult};
use crate::engine::runner::{MatchingStatus, SweepOutcome, TriggerOutcome};
use crate::AppState;

/// POST /matching/trigger/{report_id}
///
/// Runs one matching pass for the report and returns the admitted
/// matches ranked. A non-zero `pairs_skipped` with surviving pairs is
/// a partial success (200 with `warning`); every pair failing is a
/// 500.
pub async fn trigger_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<Json<TriggerResponse>> {
    let outcome = state.runner.trigger_for_report(report_id).await?;

    if outcome.total_failure() {
        let message = format!(
            "All {} candidate pairs failed for report {}",
            outcome.candidates_considered, report_id
        );
        *state.last_error.write().await = Some(message.clone());
        return Err(ApiError::Internal(message));
    }

    Ok(Json(TriggerResponse::from(outcome)))
}

/// Trigger response: outcome counters plus an optional warning for
/// partial failures
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    #[serde(flatten)]
    pub outcome: TriggerOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<TriggerOutcome> for TriggerResponse {
    fn from(outcome: TriggerOutcome) -> Self {
        let warning = (outcome.pairs_skipped > 0).then(|| {
            format!(
                "{} of {} candidate pairs skipped due to errors",
                outcome.pairs_skipped, outcome.candidates_considered
            )
        });
        Self { outcome, warning }
    }
}

/// POST /matching/trigger-all request
#[derive(Debug, Default, Deserialize)]
pub struct TriggerAllRequest {
    /// "lost", "found", or absent for both
    pub report_type: Option<String>,
}

/// POST /matching/trigger-all
///
/// Bulk sweep over every matchable report; safe to re-run.
pub async fn trigger_all(
    State(state): State<AppState>,
    body: Option<Json<TriggerAllRequest>>,
) -> ApiResult<Json<SweepOutcome>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let type_filter = match request.report_type.as_deref() {
        None => None,
        Some(raw) => Some(ReportType::parse(raw)?),
    };

    let summary = state.runner.trigger_for_all(type_filter).await?;
    Ok(Json(summary))
}

/// GET /matching/status
pub async fn matching_status(State(state): State<AppState>) -> ApiResult<Json<MatchingStatus>> {
    Ok(Json(state.runner.get_status().await?))
}

/// POST /matching/clear response
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

/// POST /matching/clear
///
/// Administrative reset: deletes all match rows, never touches reports.
pub async fn clear_matches(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    let deleted = state.runner.clear_all().await?;
    Ok(Json(ClearResponse { deleted }))
}

/// GET /matching/matches/{report_id}
///
/// All persisted matches touching a report, ranked by total score
/// with the standard tie-break (older counterpart first).
pub async fn list_matches(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Match>>> {
    if crate::db::reports::get_report(&state.db, report_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Report not found: {}", report_id)));
    }

    let records = crate::db::matches::list_for_report(&state.db, report_id).await?;
    Ok(Json(records))
}

/// PATCH /matching/matches/{id}/status request
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// "candidate", "promoted", "suppressed", or "dismissed"
    pub status: String,
}

/// PATCH /matching/matches/{id}/status
///
/// Lifecycle transition for one match record.
pub async fn set_match_status(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> ApiResult<Json<Match>> {
    let status = MatchStatus::parse(&request.status)?;

    let updated = crate::db::matches::set_match_status(&state.db, match_id, status).await?;
    if !updated {
        return Err(ApiError::NotFound(format!("Match not found: {}", match_id)));
    }

    let record = crate::db::matches::get_match(&state.db, match_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Match not found: {}", match_id)))?;

    tracing::info!(match_id = %match_id, status = status.as_str(), "Match status updated");

    Ok(Json(record))
}

/// Build matching routes
pub fn matching_routes() -> Router<AppState> {
    Router::new()
        .route("/matching/trigger/:report_id", post(trigger_report))
        .route("/matching/trigger-all", post(trigger_all))
        .route("/matching/status", get(matching_status))
        .route("/matching/clear", post(clear_matches))
        .route("/matching/matches/:id", get(list_matches))
        .route("/matching/matches/:id/status", patch(set_match_status))
}
