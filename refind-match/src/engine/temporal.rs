//! Temporal proximity scoring
//!
//! Linear decay over elapsed days between the two `occurred_at`
//! timestamps: `max(0, 1 - elapsed_days / window_days)`.

use chrono::{DateTime, Utc};

/// Proximity score for two occurrence timestamps
///
/// Symmetric in its arguments and monotonically non-increasing in the
/// elapsed time; beyond `window_days` the score is 0.0.
pub fn time_score(a: DateTime<Utc>, b: DateTime<Utc>, window_days: f64) -> f64 {
    let elapsed = (a - b).num_seconds().abs() as f64;
    let elapsed_days = elapsed / 86_400.0;
    (1.0 - elapsed_days / window_days).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn same_instant_scores_one() {
        let now = Utc::now();
        assert_eq!(time_score(now, now, 30.0), 1.0);
    }

    #[test]
    fn linear_decay_inside_window() {
        let now = Utc::now();
        let two_days = now + Duration::days(2);
        let score = time_score(now, two_days, 30.0);
        assert!((score - (1.0 - 2.0 / 30.0)).abs() < 1e-9);
    }

    #[test]
    fn beyond_window_scores_zero() {
        let now = Utc::now();
        let later = now + Duration::days(31);
        assert_eq!(time_score(now, later, 30.0), 0.0);
    }

    #[test]
    fn symmetric_in_arguments() {
        let now = Utc::now();
        let later = now + Duration::days(7);
        assert_eq!(time_score(now, later, 30.0), time_score(later, now, 30.0));
    }

    #[test]
    fn monotonic_in_elapsed_time() {
        let now = Utc::now();
        let mut prev = f64::INFINITY;
        for days in 0..35 {
            let score = time_score(now, now + Duration::days(days), 30.0);
            assert!(score <= prev);
            prev = score;
        }
    }
}
