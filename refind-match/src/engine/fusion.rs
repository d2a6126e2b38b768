//! Signal fusion and admission
//!
//! Combines the five similarity signals into one weighted total and
//! applies the minimum-score admission threshold. Pure computation:
//! deterministic for a fixed bundle and configuration, unit-testable
//! without any service or database.

use refind_common::config::{MatchingConfig, MissingImagePolicy, SignalWeights};

/// One candidate pair's computed signals
///
/// `image` is `None` when the signal is structurally absent (either
/// report has no image) or the image service failed; the configured
/// [`MissingImagePolicy`] decides how that affects the total. A text
/// provider failure is recorded as 0.0, not absence: text is always
/// computable in principle, so a failure depresses the score rather
/// than inflating the remaining signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBundle {
    pub text: f64,
    pub image: Option<f64>,
    pub geo: f64,
    pub time: f64,
    pub metadata: f64,
}

/// Weighted signal fusion with threshold admission
#[derive(Debug, Clone)]
pub struct FusionEngine {
    weights: SignalWeights,
    min_score: f64,
    missing_image_policy: MissingImagePolicy,
}

impl FusionEngine {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            weights: config.weights,
            min_score: config.min_score,
            missing_image_policy: config.missing_image_policy,
        }
    }

    /// Weighted total score for a signal bundle, in [0,1]
    ///
    /// With an image signal present:
    /// `w_text*text + w_image*image + w_geo*geo + w_time*time + w_meta*metadata`.
    ///
    /// Without one, per policy:
    /// - `Redistribute`: image weight removed, remaining weights
    ///   renormalized so they again sum to 1.0
    /// - `Drop`: image term contributes 0 with the original weights
    pub fn fuse(&self, bundle: &SignalBundle) -> f64 {
        let w = &self.weights;

        let total = match bundle.image {
            Some(image) => {
                w.text * bundle.text
                    + w.image * image
                    + w.geo * bundle.geo
                    + w.time * bundle.time
                    + w.metadata * bundle.metadata
            }
            None => {
                let partial = w.text * bundle.text
                    + w.geo * bundle.geo
                    + w.time * bundle.time
                    + w.metadata * bundle.metadata;

                match self.missing_image_policy {
                    MissingImagePolicy::Drop => partial,
                    MissingImagePolicy::Redistribute => {
                        let present_weight = w.sum() - w.image;
                        if present_weight <= 0.0 {
                            0.0
                        } else {
                            partial / present_weight
                        }
                    }
                }
            }
        };

        total.clamp(0.0, 1.0)
    }

    /// Admission rule: a pair becomes a Match iff its total clears the
    /// configured minimum score
    pub fn admits(&self, score_total: f64) -> bool {
        score_total >= self.min_score
    }
}
