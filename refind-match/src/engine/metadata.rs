//! Categorical metadata scoring
//!
//! Cheap deterministic signal with no external dependency: additive
//! bonuses for category, city, and color-set agreement, capped at 1.0.

use refind_common::db::models::Report;

const CATEGORY_BONUS: f64 = 0.5;
const CITY_BONUS: f64 = 0.3;
const COLOR_BONUS: f64 = 0.2;

/// Categorical-overlap score between two reports
///
/// Category equality (case-insensitive) contributes 0.5, city
/// equality (both present, case-insensitive) 0.3, any shared color
/// 0.2. Clamped to [0,1].
pub fn metadata_score(a: &Report, b: &Report) -> f64 {
    let mut score = 0.0;

    if a.category.eq_ignore_ascii_case(&b.category) {
        score += CATEGORY_BONUS;
    }

    if let (Some(city_a), Some(city_b)) = (&a.city, &b.city) {
        if city_a.trim().eq_ignore_ascii_case(city_b.trim()) {
            score += CITY_BONUS;
        }
    }

    if colors_intersect(&a.colors, &b.colors) {
        score += COLOR_BONUS;
    }

    score.min(1.0)
}

fn colors_intersect(a: &[String], b: &[String]) -> bool {
    a.iter()
        .any(|ca| b.iter().any(|cb| ca.eq_ignore_ascii_case(cb)))
}
