//! Database models for reports and matches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Whether a report describes a lost or a found item
///
/// Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Lost,
    Found,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Lost => "lost",
            ReportType::Found => "found",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "lost" => Ok(ReportType::Lost),
            "found" => Ok(ReportType::Found),
            other => Err(Error::InvalidInput(format!("Unknown report type: {}", other))),
        }
    }

    /// The type a matching candidate must have
    pub fn opposite(&self) -> Self {
        match self {
            ReportType::Lost => ReportType::Found,
            ReportType::Found => ReportType::Lost,
        }
    }
}

/// Moderation status of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Approved,
    Hidden,
    Removed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Hidden => "hidden",
            ReportStatus::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "approved" => Ok(ReportStatus::Approved),
            "hidden" => Ok(ReportStatus::Hidden),
            "removed" => Ok(ReportStatus::Removed),
            other => Err(Error::InvalidInput(format!(
                "Unknown report status: {}",
                other
            ))),
        }
    }
}

/// A user-submitted lost-or-found item record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub title: String,
    pub description: String,
    /// Category from the fixed taxonomy (e.g. "Electronics")
    pub category: String,
    /// Color set, compared case-insensitively
    pub colors: Vec<String>,
    /// When the item was lost or discovered
    pub occurred_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    /// Ordered media identifiers, possibly empty
    pub image_refs: Vec<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// Eligibility predicate for matching: only approved reports ever
    /// produce or receive matches.
    pub fn is_matchable(&self) -> bool {
        self.status == ReportStatus::Approved
    }

    /// Text fed to the text similarity service
    pub fn similarity_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }

    /// First image reference, if any
    pub fn primary_image(&self) -> Option<&str> {
        self.image_refs.first().map(|s| s.as_str())
    }
}

/// Lifecycle status of a persisted match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Admitted by the fusion engine, awaiting review
    Candidate,
    /// Confirmed by a user or admin
    Promoted,
    /// Hidden by moderation
    Suppressed,
    /// Rejected by the reporting user
    Dismissed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Candidate => "candidate",
            MatchStatus::Promoted => "promoted",
            MatchStatus::Suppressed => "suppressed",
            MatchStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "candidate" => Ok(MatchStatus::Candidate),
            "promoted" => Ok(MatchStatus::Promoted),
            "suppressed" => Ok(MatchStatus::Suppressed),
            "dismissed" => Ok(MatchStatus::Dismissed),
            other => Err(Error::InvalidInput(format!(
                "Unknown match status: {}",
                other
            ))),
        }
    }
}

/// A persisted record that two reports are believed to describe the
/// same physical item
///
/// `report_a < report_b` always holds (normalized unordered pair);
/// exactly one row exists per pair that ever cleared the admission
/// threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub report_a: Uuid,
    pub report_b: Uuid,
    pub score_total: f64,
    pub score_text: f64,
    /// Absent when either report carried no image at scoring time
    pub score_image: Option<f64>,
    pub score_geo: f64,
    pub score_time: f64,
    pub score_metadata: f64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Normalize two report ids into the unordered pair key
    pub fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// The report id on the other side of the pair from `report_id`
    pub fn counterpart(&self, report_id: Uuid) -> Uuid {
        if self.report_a == report_id {
            self.report_b
        } else {
            self.report_a
        }
    }
}
