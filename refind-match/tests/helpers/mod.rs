//! Shared test support: deterministic fake signal providers and
//! report fixtures against an in-memory database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use refind_common::config::MatchingConfig;
use refind_common::db::models::{Report, ReportStatus, ReportType};
use refind_match::engine::image_client::ImageSimilarity;
use refind_match::engine::text_client::TextSimilarity;
use refind_match::AppState;

/// Text provider returning one fixed score (or an outage)
pub struct FixedText(pub Option<f64>);

#[async_trait]
impl TextSimilarity for FixedText {
    async fn similarity(&self, _a: &Report, _b: &Report) -> Option<f64> {
        self.0
    }
}

/// Text provider scored per candidate report id, with a default
pub struct PerReportText {
    pub scores: HashMap<Uuid, f64>,
    pub default: f64,
}

#[async_trait]
impl TextSimilarity for PerReportText {
    async fn similarity(&self, a: &Report, b: &Report) -> Option<f64> {
        let score = self
            .scores
            .get(&b.id)
            .or_else(|| self.scores.get(&a.id))
            .copied()
            .unwrap_or(self.default);
        Some(score)
    }
}

/// Text provider that deletes the listed reports while scoring them,
/// reproducing a report removed between candidate selection and match
/// persistence
pub struct VanishingCandidateText {
    pub pool: SqlitePool,
    pub victims: Vec<Uuid>,
    pub score: f64,
}

#[async_trait]
impl TextSimilarity for VanishingCandidateText {
    async fn similarity(&self, _a: &Report, b: &Report) -> Option<f64> {
        if self.victims.contains(&b.id) {
            refind_match::db::reports::delete_report(&self.pool, b.id)
                .await
                .expect("delete candidate report");
        }
        Some(self.score)
    }
}

/// Image provider honoring structural absence, fixed score otherwise
pub struct FixedImage(pub Option<f64>);

#[async_trait]
impl ImageSimilarity for FixedImage {
    async fn similarity(&self, a: &Report, b: &Report) -> Option<f64> {
        if a.image_refs.is_empty() || b.image_refs.is_empty() {
            return None;
        }
        self.0
    }
}

/// Builder for report fixtures
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new(report_type: ReportType) -> Self {
        let now = Utc::now();
        Self {
            report: Report {
                id: Uuid::new_v4(),
                report_type,
                status: ReportStatus::Approved,
                title: "Black iPhone 13".to_string(),
                description: "Lost near the railway station".to_string(),
                category: "Electronics".to_string(),
                colors: vec!["black".to_string()],
                occurred_at: now,
                latitude: Some(6.9271),
                longitude: Some(79.8612),
                city: Some("Colombo".to_string()),
                image_refs: vec![],
                owner_id: Uuid::new_v4(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn status(mut self, status: ReportStatus) -> Self {
        self.report.status = status;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.report.title = title.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.report.category = category.to_string();
        self
    }

    pub fn colors(mut self, colors: &[&str]) -> Self {
        self.report.colors = colors.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn city(mut self, city: Option<&str>) -> Self {
        self.report.city = city.map(|s| s.to_string());
        self
    }

    pub fn location(mut self, lat: f64, lon: f64) -> Self {
        self.report.latitude = Some(lat);
        self.report.longitude = Some(lon);
        self
    }

    pub fn no_location(mut self) -> Self {
        self.report.latitude = None;
        self.report.longitude = None;
        self
    }

    pub fn occurred_days_ago(mut self, days: i64) -> Self {
        self.report.occurred_at = Utc::now() - Duration::days(days);
        self
    }

    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.report.occurred_at = occurred_at;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.report.created_at = created_at;
        self
    }

    pub fn images(mut self, refs: &[&str]) -> Self {
        self.report.image_refs = refs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Report {
        self.report
    }

    /// Build and persist
    pub async fn insert(self, pool: &SqlitePool) -> Report {
        let report = self.report;
        refind_match::db::reports::insert_report(pool, &report)
            .await
            .expect("insert report fixture");
        report
    }
}

/// Fresh in-memory database with the full schema
pub async fn memory_pool() -> SqlitePool {
    refind_common::db::init_memory_pool()
        .await
        .expect("in-memory pool")
}

/// App state wired to fake providers and the default configuration
pub fn test_state(
    pool: SqlitePool,
    text: Arc<dyn TextSimilarity>,
    image: Arc<dyn ImageSimilarity>,
) -> AppState {
    AppState::new(pool, MatchingConfig::default(), text, image)
}

/// Total match rows in the database
pub async fn match_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM matches")
        .fetch_one(pool)
        .await
        .expect("count matches")
}
