//! Configuration loading, validation, and root folder resolution
//!
//! Matching parameters resolve with Environment → TOML → compiled
//! default priority. Validation happens once at load time; an invalid
//! weight vector or threshold is fatal, never silently clamped.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. REFIND_ROOT environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var("REFIND_ROOT") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(config_path) = default_config_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    default_root_folder()
}

/// Default configuration file path for the platform
/// (`~/.config/refind/config.toml` or the OS equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("refind").join("config.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("refind"))
        .unwrap_or_else(|| PathBuf::from("./refind_data"))
}

/// Service configuration file contents
///
/// Matches `~/.config/refind/config.toml`:
///
/// ```toml
/// root_folder = "/var/lib/refind"
///
/// [matching]
/// min_score = 0.65
/// time_window_days = 30.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder override
    pub root_folder: Option<String>,

    /// Matching engine parameters
    #[serde(default)]
    pub matching: MatchingToml,
}

impl TomlConfig {
    /// Load the config file if it exists; missing file yields defaults
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Raw `[matching]` table from TOML; every field optional so a sparse
/// file overrides only what it names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingToml {
    pub weight_text: Option<f64>,
    pub weight_image: Option<f64>,
    pub weight_geo: Option<f64>,
    pub weight_time: Option<f64>,
    pub weight_metadata: Option<f64>,
    pub min_score: Option<f64>,
    pub time_window_days: Option<f64>,
    pub provider_timeout_secs: Option<u64>,
    pub missing_image_policy: Option<String>,
    pub text_service_url: Option<String>,
    pub image_service_url: Option<String>,
    pub max_in_flight: Option<usize>,
    /// Geo decay curve as `[[km, score], ...]`, e.g. `[[1.0, 1.0], [5.0, 0.8]]`
    pub geo_breakpoints: Option<Vec<[f64; 2]>>,
}

/// Weight of each similarity signal in the fused total
///
/// Weights must sum to 1.0; validated once at configuration load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub text: f64,
    pub image: f64,
    pub geo: f64,
    pub time: f64,
    pub metadata: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            text: 0.40,
            image: 0.30,
            geo: 0.15,
            time: 0.05,
            metadata: 0.10,
        }
    }
}

impl SignalWeights {
    /// Sum of all five weights
    pub fn sum(&self) -> f64 {
        self.text + self.image + self.geo + self.time + self.metadata
    }
}

/// Policy for candidate pairs where the image signal is absent
/// (either report has no images, or the image service failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingImagePolicy {
    /// Image term contributes 0 with the original weights
    Drop,
    /// Image weight is removed and the remaining weights renormalized
    Redistribute,
}

impl MissingImagePolicy {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "redistribute" => Ok(Self::Redistribute),
            other => Err(Error::Config(format!(
                "Unknown missing_image_policy: {} (expected drop|redistribute)",
                other
            ))),
        }
    }
}

/// Validated matching engine configuration
///
/// Construct through [`MatchingConfig::resolve`]; field invariants
/// (weights sum to 1.0, min_score in [0,1], positive window/timeout,
/// strictly increasing breakpoint distances) hold for every instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Signal weight vector, sums to 1.0
    pub weights: SignalWeights,

    /// Minimum fused score for a pair to be persisted as a Match
    pub min_score: f64,

    /// Geo decay curve: (max_distance_km, score) pairs, distances
    /// strictly increasing, scores non-increasing; beyond the last
    /// breakpoint the score is 0.0
    pub geo_breakpoints: Vec<(f64, f64)>,

    /// Linear time decay window in days
    pub time_window_days: f64,

    /// Per-call timeout for the external similarity services
    pub provider_timeout: Duration,

    /// How to weight pairs with no image signal
    pub missing_image_policy: MissingImagePolicy,

    /// Base URL of the text similarity service
    pub text_service_url: String,

    /// Base URL of the image similarity service
    pub image_service_url: String,

    /// Maximum concurrent candidate scorings per trigger
    pub max_in_flight: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            min_score: 0.65,
            geo_breakpoints: vec![
                (1.0, 1.0),
                (5.0, 0.8),
                (10.0, 0.6),
                (25.0, 0.4),
                (50.0, 0.2),
            ],
            time_window_days: 30.0,
            provider_timeout: Duration::from_secs(3),
            missing_image_policy: MissingImagePolicy::Redistribute,
            text_service_url: "http://127.0.0.1:5850".to_string(),
            image_service_url: "http://127.0.0.1:5851".to_string(),
            max_in_flight: 8,
        }
    }
}

impl MatchingConfig {
    /// Resolve configuration with Environment → TOML → default priority,
    /// then validate
    ///
    /// # Errors
    /// Returns `Error::Config` for any invariant violation; callers
    /// must treat this as fatal at startup.
    pub fn resolve(toml: &MatchingToml) -> Result<Self> {
        let defaults = Self::default();

        let mut config = Self {
            weights: SignalWeights {
                text: resolve_f64("REFIND_WEIGHT_TEXT", toml.weight_text, defaults.weights.text)?,
                image: resolve_f64(
                    "REFIND_WEIGHT_IMAGE",
                    toml.weight_image,
                    defaults.weights.image,
                )?,
                geo: resolve_f64("REFIND_WEIGHT_GEO", toml.weight_geo, defaults.weights.geo)?,
                time: resolve_f64("REFIND_WEIGHT_TIME", toml.weight_time, defaults.weights.time)?,
                metadata: resolve_f64(
                    "REFIND_WEIGHT_METADATA",
                    toml.weight_metadata,
                    defaults.weights.metadata,
                )?,
            },
            min_score: resolve_f64("REFIND_MIN_SCORE", toml.min_score, defaults.min_score)?,
            geo_breakpoints: toml
                .geo_breakpoints
                .as_ref()
                .map(|pts| pts.iter().map(|p| (p[0], p[1])).collect())
                .unwrap_or(defaults.geo_breakpoints),
            time_window_days: resolve_f64(
                "REFIND_TIME_WINDOW_DAYS",
                toml.time_window_days,
                defaults.time_window_days,
            )?,
            provider_timeout: Duration::from_secs(resolve_u64(
                "REFIND_PROVIDER_TIMEOUT_SECS",
                toml.provider_timeout_secs,
                defaults.provider_timeout.as_secs(),
            )?),
            missing_image_policy: defaults.missing_image_policy,
            text_service_url: resolve_string(
                "REFIND_TEXT_SERVICE_URL",
                toml.text_service_url.as_deref(),
                &defaults.text_service_url,
            ),
            image_service_url: resolve_string(
                "REFIND_IMAGE_SERVICE_URL",
                toml.image_service_url.as_deref(),
                &defaults.image_service_url,
            ),
            max_in_flight: toml.max_in_flight.unwrap_or(defaults.max_in_flight),
        };

        let policy_str = std::env::var("REFIND_MISSING_IMAGE_POLICY")
            .ok()
            .or_else(|| toml.missing_image_policy.clone());
        if let Some(s) = policy_str {
            config.missing_image_policy = MissingImagePolicy::parse(&s)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration invariants
    pub fn validate(&self) -> Result<()> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "Signal weights must sum to 1.0, got {:.6} (text={}, image={}, geo={}, time={}, metadata={})",
                sum,
                self.weights.text,
                self.weights.image,
                self.weights.geo,
                self.weights.time,
                self.weights.metadata
            )));
        }

        for (name, w) in [
            ("text", self.weights.text),
            ("image", self.weights.image),
            ("geo", self.weights.geo),
            ("time", self.weights.time),
            ("metadata", self.weights.metadata),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::Config(format!(
                    "Weight {} out of range [0,1]: {}",
                    name, w
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(Error::Config(format!(
                "min_score out of range [0,1]: {}",
                self.min_score
            )));
        }

        if self.time_window_days <= 0.0 {
            return Err(Error::Config(format!(
                "time_window_days must be positive: {}",
                self.time_window_days
            )));
        }

        if self.provider_timeout.is_zero() {
            return Err(Error::Config(
                "provider_timeout_secs must be positive".to_string(),
            ));
        }

        if self.max_in_flight == 0 {
            return Err(Error::Config("max_in_flight must be positive".to_string()));
        }

        if self.geo_breakpoints.is_empty() {
            return Err(Error::Config(
                "geo_breakpoints must not be empty".to_string(),
            ));
        }
        let mut prev_km = 0.0;
        let mut prev_score = f64::INFINITY;
        for &(km, score) in &self.geo_breakpoints {
            if km <= prev_km {
                return Err(Error::Config(format!(
                    "geo_breakpoints distances must be strictly increasing (at {} km)",
                    km
                )));
            }
            if !(0.0..=1.0).contains(&score) {
                return Err(Error::Config(format!(
                    "geo_breakpoints score out of range [0,1]: {}",
                    score
                )));
            }
            if score > prev_score {
                return Err(Error::Config(format!(
                    "geo_breakpoints scores must be non-increasing (at {} km)",
                    km
                )));
            }
            prev_km = km;
            prev_score = score;
        }

        Ok(())
    }
}

fn resolve_f64(env_var: &str, toml_value: Option<f64>, default: f64) -> Result<f64> {
    if let Ok(raw) = std::env::var(env_var) {
        return raw
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("{} is not a number: {}", env_var, raw)));
    }
    Ok(toml_value.unwrap_or(default))
}

fn resolve_u64(env_var: &str, toml_value: Option<u64>, default: u64) -> Result<u64> {
    if let Ok(raw) = std::env::var(env_var) {
        return raw
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{} is not an integer: {}", env_var, raw)));
    }
    Ok(toml_value.unwrap_or(default))
}

fn resolve_string(env_var: &str, toml_value: Option<&str>, default: &str) -> String {
    if let Ok(raw) = std::env::var(env_var) {
        if !raw.trim().is_empty() {
            return raw;
        }
    }
    toml_value.unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MatchingConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = MatchingConfig::default();
        config.weights.text = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn threshold_must_be_in_unit_range() {
        let mut config = MatchingConfig::default();
        config.min_score = 1.2;
        assert!(config.validate().is_err());

        config.min_score = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn breakpoints_must_increase_in_distance() {
        let mut config = MatchingConfig::default();
        config.geo_breakpoints = vec![(5.0, 0.8), (5.0, 0.6)];
        assert!(config.validate().is_err());

        config.geo_breakpoints = vec![(5.0, 0.4), (10.0, 0.8)];
        assert!(config.validate().is_err(), "scores must not increase");
    }

    #[test]
    fn missing_image_policy_parses() {
        assert_eq!(
            MissingImagePolicy::parse("redistribute").unwrap(),
            MissingImagePolicy::Redistribute
        );
        assert_eq!(
            MissingImagePolicy::parse("Drop").unwrap(),
            MissingImagePolicy::Drop
        );
        assert!(MissingImagePolicy::parse("ignore").is_err());
    }

    #[test]
    fn sparse_toml_overrides_only_named_fields() {
        let toml: MatchingToml = toml::from_str("min_score = 0.5").unwrap();
        let config = MatchingConfig::resolve(&toml).unwrap();
        assert_eq!(config.min_score, 0.5);
        assert_eq!(config.time_window_days, 30.0);
        assert_eq!(config.weights, SignalWeights::default());
    }
}
