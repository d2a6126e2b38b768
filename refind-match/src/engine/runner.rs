//! Match lifecycle runner
//!
//! Drives one full matching pass: candidate selection → signal
//! computation (bounded concurrency) → fusion → idempotent upsert of
//! admitted pairs. Also exposes the bulk sweep, status summary, and
//! administrative clear.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use refind_common::config::MatchingConfig;
use refind_common::db::models::{Match, Report, ReportType};
use refind_common::{Error, Result};

use crate::db::{matches, reports};
use crate::engine::fusion::{FusionEngine, SignalBundle};
use crate::engine::image_client::ImageSimilarity;
use crate::engine::text_client::TextSimilarity;
use crate::engine::{geo, metadata, selector, temporal};

/// A persisted match paired with the candidate metadata the ranking
/// tie-break needs
#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    #[serde(flatten)]
    pub record: Match,
    /// The candidate (counterpart) report id
    pub candidate_id: Uuid,
    /// Candidate report creation time, the ranking tie-break
    pub candidate_created_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of a single-report trigger
#[derive(Debug, Serialize)]
pub struct TriggerOutcome {
    pub report_id: Uuid,
    /// False when the source report was not in a matchable state
    pub source_eligible: bool,
    pub candidates_considered: usize,
    pub matches_upserted: usize,
    pub pairs_skipped: usize,
    /// Admitted matches from this pass, ranked
    pub matches: Vec<RankedMatch>,
}

impl TriggerOutcome {
    /// Every considered pair failed; callers surface this as an error
    pub fn total_failure(&self) -> bool {
        self.candidates_considered > 0 && self.pairs_skipped == self.candidates_considered
    }
}

/// Outcome of a bulk sweep
#[derive(Debug, Default, Serialize)]
pub struct SweepOutcome {
    pub reports_processed: usize,
    pub candidates_considered: usize,
    pub matches_upserted: usize,
    pub pairs_skipped: usize,
}

/// Operational status summary
#[derive(Debug, Serialize)]
pub struct MatchingStatus {
    pub reports_total: i64,
    pub matchable_lost: i64,
    pub matchable_found: i64,
    pub matches_total: i64,
    pub matches_candidate: i64,
    pub matches_promoted: i64,
    pub matches_suppressed: i64,
    pub matches_dismissed: i64,
}

/// Match lifecycle runner
///
/// Signal providers are injected trait objects so the whole pipeline
/// runs against deterministic fakes in tests.
pub struct MatchRunner {
    db: SqlitePool,
    config: Arc<MatchingConfig>,
    fusion: FusionEngine,
    text: Arc<dyn TextSimilarity>,
    image: Arc<dyn ImageSimilarity>,
}

impl MatchRunner {
    pub fn new(
        db: SqlitePool,
        config: Arc<MatchingConfig>,
        text: Arc<dyn TextSimilarity>,
        image: Arc<dyn ImageSimilarity>,
    ) -> Self {
        let fusion = FusionEngine::new(&config);
        Self {
            db,
            config,
            fusion,
            text,
            image,
        }
    }

    /// Run one matching pass for a report
    ///
    /// # Errors
    /// `Error::NotFound` if the report does not exist. An ineligible
    /// report is not an error: the outcome is empty with
    /// `source_eligible = false`.
    pub async fn trigger_for_report(&self, report_id: Uuid) -> Result<TriggerOutcome> {
        let source = reports::get_report(&self.db, report_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Report not found: {}", report_id)))?;

        self.trigger_for(&source).await
    }

    /// Matching pass for an already-loaded source report
    pub async fn trigger_for(&self, source: &Report) -> Result<TriggerOutcome> {
        if !source.is_matchable() {
            return Ok(TriggerOutcome {
                report_id: source.id,
                source_eligible: false,
                candidates_considered: 0,
                matches_upserted: 0,
                pairs_skipped: 0,
                matches: Vec::new(),
            });
        }

        let candidates = selector::select_candidates(&self.db, source).await?;
        let candidates_considered = candidates.len();

        tracing::debug!(
            report_id = %source.id,
            candidates = candidates_considered,
            "Scoring candidates"
        );

        // Signal computation is independent per candidate; bound the
        // in-flight count so the external services are not overwhelmed
        let scored: Vec<(Report, SignalBundle, f64)> = stream::iter(candidates)
            .map(|candidate| async move {
                let bundle = self.score_pair(source, &candidate).await;
                let total = self.fusion.fuse(&bundle);
                (candidate, bundle, total)
            })
            .buffer_unordered(self.config.max_in_flight)
            .collect()
            .await;

        let mut ranked = Vec::new();
        let mut pairs_skipped = 0usize;

        for (candidate, bundle, total) in &scored {
            if !self.fusion.admits(*total) {
                continue;
            }

            // A candidate can lose eligibility or be deleted between
            // selection and persistence; skip that pair, keep the batch
            match matches::upsert_match(&self.db, source.id, candidate.id, bundle, *total).await {
                Ok(record) => ranked.push(RankedMatch {
                    record,
                    candidate_id: candidate.id,
                    candidate_created_at: candidate.created_at,
                }),
                Err(e) => {
                    tracing::warn!(
                        report_id = %source.id,
                        candidate_id = %candidate.id,
                        error = %e,
                        "Failed to persist match, skipping pair"
                    );
                    pairs_skipped += 1;
                }
            }
        }

        rank_matches(&mut ranked);

        let outcome = TriggerOutcome {
            report_id: source.id,
            source_eligible: true,
            candidates_considered,
            matches_upserted: ranked.len(),
            pairs_skipped,
            matches: ranked,
        };

        tracing::info!(
            report_id = %source.id,
            candidates = outcome.candidates_considered,
            upserted = outcome.matches_upserted,
            skipped = outcome.pairs_skipped,
            "Matching pass complete"
        );

        Ok(outcome)
    }

    /// Sweep every matchable report of the filtered type (or both)
    ///
    /// Idempotent: each pair is keyed on its unordered ids, so
    /// re-running (or hitting a pair from both directions) re-upserts
    /// identical rows instead of duplicating them.
    pub async fn trigger_for_all(&self, type_filter: Option<ReportType>) -> Result<SweepOutcome> {
        let types: &[ReportType] = match type_filter {
            Some(ReportType::Lost) => &[ReportType::Lost],
            Some(ReportType::Found) => &[ReportType::Found],
            None => &[ReportType::Lost, ReportType::Found],
        };

        let mut summary = SweepOutcome::default();

        for report_type in types {
            let sources = reports::list_matchable(&self.db, *report_type).await?;
            for source in &sources {
                let outcome = self.trigger_for(source).await?;
                summary.reports_processed += 1;
                summary.candidates_considered += outcome.candidates_considered;
                summary.matches_upserted += outcome.matches_upserted;
                summary.pairs_skipped += outcome.pairs_skipped;
            }
        }

        tracing::info!(
            reports = summary.reports_processed,
            upserted = summary.matches_upserted,
            skipped = summary.pairs_skipped,
            "Bulk matching sweep complete"
        );

        Ok(summary)
    }

    /// Operational counts for the status endpoint
    pub async fn get_status(&self) -> Result<MatchingStatus> {
        let (reports_total, matchable_lost, matchable_found) =
            reports::report_counts(&self.db).await?;
        let counts = matches::status_counts(&self.db).await?;

        let by_status = |name: &str| {
            counts
                .iter()
                .find(|(status, _)| status == name)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };

        Ok(MatchingStatus {
            reports_total,
            matchable_lost,
            matchable_found,
            matches_total: counts.iter().map(|(_, n)| n).sum(),
            matches_candidate: by_status("candidate"),
            matches_promoted: by_status("promoted"),
            matches_suppressed: by_status("suppressed"),
            matches_dismissed: by_status("dismissed"),
        })
    }

    /// Administrative reset: drop all match rows, touch no reports
    pub async fn clear_all(&self) -> Result<u64> {
        let deleted = matches::delete_all(&self.db).await?;
        tracing::info!(deleted, "Cleared all match records");
        Ok(deleted)
    }

    /// Compute the five signals for one pair
    async fn score_pair(&self, source: &Report, candidate: &Report) -> SignalBundle {
        // An unavailable text service scores 0.0 (weight kept); an
        // absent image stays None for the configured policy
        let text = self.text.similarity(source, candidate).await.unwrap_or(0.0);
        let image = self.image.similarity(source, candidate).await;

        let geo = geo::geo_score(
            source.latitude.zip(source.longitude),
            candidate.latitude.zip(candidate.longitude),
            &self.config.geo_breakpoints,
        );
        let time = temporal::time_score(
            source.occurred_at,
            candidate.occurred_at,
            self.config.time_window_days,
        );
        let metadata = metadata::metadata_score(source, candidate);

        SignalBundle {
            text,
            image,
            geo,
            time,
            metadata,
        }
    }
}

/// Rank admitted matches: total descending, then candidate creation
/// time ascending (older candidates surface first), then candidate id
/// for a total order
pub fn rank_matches(matches: &mut [RankedMatch]) {
    matches.sort_by(|a, b| {
        b.record
            .score_total
            .total_cmp(&a.record.score_total)
            .then_with(|| a.candidate_created_at.cmp(&b.candidate_created_at))
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use refind_common::db::models::MatchStatus;

    fn ranked(total: f64, created_offset_days: i64) -> RankedMatch {
        let now = Utc::now();
        let candidate_id = Uuid::new_v4();
        RankedMatch {
            record: Match {
                id: Uuid::new_v4(),
                report_a: Uuid::new_v4(),
                report_b: candidate_id,
                score_total: total,
                score_text: total,
                score_image: None,
                score_geo: 0.0,
                score_time: 0.0,
                score_metadata: 0.0,
                status: MatchStatus::Candidate,
                created_at: now,
                updated_at: now,
            },
            candidate_id,
            candidate_created_at: now + Duration::days(created_offset_days),
        }
    }

    #[test]
    fn ranking_orders_by_score_descending() {
        let mut entries = vec![ranked(0.7, 0), ranked(0.9, 0), ranked(0.8, 0)];
        rank_matches(&mut entries);
        let scores: Vec<f64> = entries.iter().map(|e| e.record.score_total).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn equal_scores_rank_older_candidate_first() {
        let older = ranked(0.7, -3);
        let newer = ranked(0.7, 0);
        let older_candidate = older.candidate_id;

        let mut entries = vec![ranked(0.9, 0), newer, older];
        rank_matches(&mut entries);

        assert_eq!(entries[0].record.score_total, 0.9);
        assert_eq!(entries[1].candidate_id, older_candidate);
    }

    #[test]
    fn total_failure_requires_nonzero_candidates() {
        let empty = TriggerOutcome {
            report_id: Uuid::new_v4(),
            source_eligible: true,
            candidates_considered: 0,
            matches_upserted: 0,
            pairs_skipped: 0,
            matches: Vec::new(),
        };
        assert!(!empty.total_failure());

        let failed = TriggerOutcome {
            candidates_considered: 3,
            pairs_skipped: 3,
            ..empty
        };
        assert!(failed.total_failure());
    }
}
