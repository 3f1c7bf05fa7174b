use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{RetentionError, RetentionResult};
use crate::types::segment_names;

/// Root application configuration. Loaded from environment variables
/// with the prefix `RETENTION_EXPRESS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    /// Cart abandonment recency window in days; users outside it are not
    /// eligible for segmentation.
    #[serde(default = "default_abandon_window_days")]
    pub abandon_window_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Floor below which a segment is merged into the fallback bucket.
    #[serde(default = "default_min_segment_size")]
    pub min_segment_size: usize,
    /// Advisory ceiling; larger segments are flagged but not split.
    #[serde(default = "default_max_segment_size")]
    pub max_segment_size: usize,
    /// "Recent customer" rule window in days.
    #[serde(default = "default_recent_order_days")]
    pub recent_order_days: u32,
    /// Name of the unconditional catch-all segment that absorbs merges.
    #[serde(default = "default_fallback_segment")]
    pub fallback_segment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_optimal_segment_size")]
    pub optimal_segment_size: usize,
    /// Days-since-last-order horizon for the recency factor; members at or
    /// beyond the horizon (including never-ordered) contribute zero recency.
    #[serde(default = "default_recency_horizon_days")]
    pub recency_horizon_days: u32,
    /// AOV value mapped to 1.0 in the profitability sub-score.
    #[serde(default = "default_aov_norm_cap")]
    pub aov_norm_cap: f64,
    /// AOV value mapped to 1.0 in the simulated lift sub-score.
    #[serde(default = "default_lift_aov_cap")]
    pub lift_aov_cap: f64,
    /// Business priority per segment name.
    #[serde(default = "default_strategic_fit")]
    pub strategic_fit: BTreeMap<String, f64>,
    /// Fit assigned to segment names absent from the table.
    #[serde(default = "default_strategic_fit_floor")]
    pub strategic_fit_floor: f64,
}

/// Weights of the five scoring dimensions; must sum to 1.0.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_weight_conversion")]
    pub conversion_potential: f64,
    #[serde(default = "default_weight_profitability")]
    pub profitability: f64,
    #[serde(default = "default_weight_lift")]
    pub lift_vs_control: f64,
    #[serde(default = "default_weight_strategic")]
    pub strategic_fit: f64,
    #[serde(default = "default_weight_size")]
    pub size_score: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.conversion_potential
            + self.profitability
            + self.lift_vs_control
            + self.strategic_fit
            + self.size_score
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_users")]
    pub users: usize,
    #[serde(default = "default_generator_seed")]
    pub seed: u64,
}

// Default functions
fn default_abandon_window_days() -> u32 {
    7
}
fn default_min_segment_size() -> usize {
    500
}
fn default_max_segment_size() -> usize {
    20_000
}
fn default_recent_order_days() -> u32 {
    30
}
fn default_fallback_segment() -> String {
    segment_names::OTHER_BUCKET.to_string()
}
fn default_optimal_segment_size() -> usize {
    5_000
}
fn default_recency_horizon_days() -> u32 {
    90
}
fn default_aov_norm_cap() -> f64 {
    1_000.0
}
fn default_lift_aov_cap() -> f64 {
    2_000.0
}
fn default_strategic_fit() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (segment_names::HIGH_AOV_PREMIUM.to_string(), 1.0),
        (segment_names::MED_AOV_HIGH_ENGAGEMENT.to_string(), 0.8),
        (segment_names::MED_AOV_MED_ENG_HIGH_PROFIT.to_string(), 0.65),
        (segment_names::LOW_AOV_HIGH_ENGAGEMENT.to_string(), 0.55),
        (segment_names::RECENT_CUSTOMERS.to_string(), 0.45),
        (segment_names::OTHER_BUCKET.to_string(), 0.3),
    ])
}
fn default_strategic_fit_floor() -> f64 {
    0.3
}
fn default_weight_conversion() -> f64 {
    0.25
}
fn default_weight_profitability() -> f64 {
    0.25
}
fn default_weight_lift() -> f64 {
    0.20
}
fn default_weight_strategic() -> f64 {
    0.20
}
fn default_weight_size() -> f64 {
    0.10
}
fn default_generator_users() -> usize {
    50_000
}
fn default_generator_seed() -> u64 {
    42
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            abandon_window_days: default_abandon_window_days(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_segment_size: default_min_segment_size(),
            max_segment_size: default_max_segment_size(),
            recent_order_days: default_recent_order_days(),
            fallback_segment: default_fallback_segment(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            optimal_segment_size: default_optimal_segment_size(),
            recency_horizon_days: default_recency_horizon_days(),
            aov_norm_cap: default_aov_norm_cap(),
            lift_aov_cap: default_lift_aov_cap(),
            strategic_fit: default_strategic_fit(),
            strategic_fit_floor: default_strategic_fit_floor(),
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            conversion_potential: default_weight_conversion(),
            profitability: default_weight_profitability(),
            lift_vs_control: default_weight_lift(),
            strategic_fit: default_weight_strategic(),
            size_score: default_weight_size(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            users: default_generator_users(),
            seed: default_generator_seed(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            segmentation: SegmentationConfig::default(),
            scoring: ScoringConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("RETENTION_EXPRESS")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Reject invalid configurations before any computation runs.
    pub fn validate(&self) -> RetentionResult<()> {
        let w = &self.scoring.weights;
        for (name, value) in [
            ("conversion_potential", w.conversion_potential),
            ("profitability", w.profitability),
            ("lift_vs_control", w.lift_vs_control),
            ("strategic_fit", w.strategic_fit),
            ("size_score", w.size_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RetentionError::Config(format!(
                    "scoring weight {name} must be in [0, 1], got {value}"
                )));
            }
        }
        let sum = w.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RetentionError::Config(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }

        let seg = &self.segmentation;
        if seg.max_segment_size == 0 {
            return Err(RetentionError::Config(
                "max_segment_size must be positive".to_string(),
            ));
        }
        if seg.min_segment_size > seg.max_segment_size {
            return Err(RetentionError::Config(format!(
                "min_segment_size {} exceeds max_segment_size {}",
                seg.min_segment_size, seg.max_segment_size
            )));
        }
        if seg.fallback_segment.is_empty() {
            return Err(RetentionError::Config(
                "fallback_segment name must not be empty".to_string(),
            ));
        }

        let scoring = &self.scoring;
        if scoring.optimal_segment_size == 0 {
            return Err(RetentionError::Config(
                "optimal_segment_size must be positive".to_string(),
            ));
        }
        if scoring.recency_horizon_days == 0 {
            return Err(RetentionError::Config(
                "recency_horizon_days must be positive".to_string(),
            ));
        }
        if scoring.aov_norm_cap <= 0.0 || scoring.lift_aov_cap <= 0.0 {
            return Err(RetentionError::Config(
                "AOV normalization caps must be positive".to_string(),
            ));
        }
        for (name, fit) in &scoring.strategic_fit {
            if !(0.0..=1.0).contains(fit) {
                return Err(RetentionError::Config(format!(
                    "strategic_fit[{name}] must be in [0, 1], got {fit}"
                )));
            }
        }

        if self.universe.abandon_window_days == 0 {
            return Err(RetentionError::Config(
                "abandon_window_days must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.scoring.weights.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let mut config = AppConfig::default();
        // 0.24 + 0.25 + 0.20 + 0.20 + 0.10 = 0.99
        config.scoring.weights.conversion_potential = 0.24;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RetentionError::Config(_)));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let mut config = AppConfig::default();
        config.segmentation.min_segment_size = 30_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategic_fit_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config
            .scoring
            .strategic_fit
            .insert("vip_whales".to_string(), 1.4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_strategic_fit_covers_all_default_segments() {
        let config = AppConfig::default();
        for name in [
            segment_names::HIGH_AOV_PREMIUM,
            segment_names::MED_AOV_HIGH_ENGAGEMENT,
            segment_names::MED_AOV_MED_ENG_HIGH_PROFIT,
            segment_names::LOW_AOV_HIGH_ENGAGEMENT,
            segment_names::RECENT_CUSTOMERS,
            segment_names::OTHER_BUCKET,
        ] {
            assert!(config.scoring.strategic_fit.contains_key(name));
        }
    }
}
