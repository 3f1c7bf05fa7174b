//! Percentile threshold calculator.
//!
//! Cut points are computed once per run from the Universe's empirical
//! distributions and looked up by (feature, percentile) during rule
//! evaluation.

use tracing::{debug, warn};

use retention_core::error::{RetentionError, RetentionResult};
use retention_core::types::{Feature, ThresholdCut, UserRecord};

/// Two cut values closer than this are treated as a collapsed tier.
const COLLAPSE_TOLERANCE: f64 = 1e-9;

/// Lookup table of percentile cut points over the Universe.
#[derive(Debug, Clone)]
pub struct ThresholdSet {
    cuts: Vec<ThresholdCut>,
    collapsed_features: Vec<Feature>,
}

impl ThresholdSet {
    /// Compute the requested (feature, percentile) cut points.
    ///
    /// Fails with `EmptyUniverse` when there is nothing to take percentiles
    /// over. A feature whose requested tiers land on the same value (a
    /// degenerate distribution, e.g. all members share one AOV) is recorded
    /// as collapsed and logged; partitioning still proceeds and stays
    /// exhaustive under the ordered rules.
    pub fn compute(
        universe: &[UserRecord],
        requested: &[(Feature, u8)],
    ) -> RetentionResult<Self> {
        if universe.is_empty() {
            return Err(RetentionError::EmptyUniverse);
        }

        let mut features: Vec<Feature> = Vec::new();
        for (feature, _) in requested {
            if !features.contains(feature) {
                features.push(*feature);
            }
        }

        let mut cuts = Vec::with_capacity(requested.len());
        let mut collapsed_features = Vec::new();

        for feature in features {
            let mut values: Vec<f64> = universe.iter().map(|u| u.feature(feature)).collect();
            values.sort_by(f64::total_cmp);

            let mut percentiles: Vec<u8> = requested
                .iter()
                .filter(|(f, _)| *f == feature)
                .map(|(_, p)| *p)
                .collect();
            percentiles.sort_unstable();
            percentiles.dedup();

            let feature_cuts: Vec<ThresholdCut> = percentiles
                .iter()
                .map(|&percentile| ThresholdCut {
                    feature,
                    percentile,
                    value: percentile_value(&values, percentile),
                })
                .collect();

            let collapsed = feature_cuts
                .windows(2)
                .any(|w| (w[1].value - w[0].value).abs() <= COLLAPSE_TOLERANCE);
            if collapsed && feature_cuts.len() > 1 {
                warn!(
                    feature = %feature,
                    "degenerate distribution: percentile tiers collapsed to one value"
                );
                collapsed_features.push(feature);
            }

            for cut in &feature_cuts {
                debug!(feature = %cut.feature, percentile = cut.percentile, value = cut.value, "threshold computed");
            }
            cuts.extend(feature_cuts);
        }

        Ok(Self {
            cuts,
            collapsed_features,
        })
    }

    /// Cut value for (feature, percentile), if it was requested.
    pub fn value(&self, feature: Feature, percentile: u8) -> Option<f64> {
        self.cuts
            .iter()
            .find(|c| c.feature == feature && c.percentile == percentile)
            .map(|c| c.value)
    }

    pub fn cuts(&self) -> &[ThresholdCut] {
        &self.cuts
    }

    pub fn is_collapsed(&self, feature: Feature) -> bool {
        self.collapsed_features.contains(&feature)
    }

    pub fn collapsed_features(&self) -> &[Feature] {
        &self.collapsed_features
    }
}

/// Percentile over pre-sorted values with linear interpolation between ranks.
fn percentile_value(sorted: &[f64], percentile: u8) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let p = f64::from(percentile).clamp(0.0, 100.0) / 100.0;
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, aov: f64, engagement: f64, profitability: f64) -> UserRecord {
        UserRecord {
            user_id: id.to_string(),
            cart_abandon_days_ago: 1,
            days_since_last_order: Some(10),
            avg_order_value: aov,
            sessions_last_30d: 5,
            num_cart_items: 2,
            engagement_score: engagement,
            profitability_score: profitability,
        }
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile_value(&values, 0), 10.0);
        assert_eq!(percentile_value(&values, 50), 30.0);
        assert_eq!(percentile_value(&values, 100), 50.0);
        // 75th over 5 values: rank 3.0 exactly
        assert_eq!(percentile_value(&values, 75), 40.0);
        // 40th: rank 1.6 -> 20 + 0.6 * 10
        assert!((percentile_value(&values, 40) - 26.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_universe_rejected() {
        let err = ThresholdSet::compute(&[], &[(Feature::AvgOrderValue, 75)]).unwrap_err();
        assert!(matches!(err, RetentionError::EmptyUniverse));
    }

    #[test]
    fn test_requested_cuts_are_looked_up() {
        let universe: Vec<UserRecord> = (0..100)
            .map(|i| user(&format!("u{i}"), 10.0 + i as f64, i as f64 / 100.0, 0.5))
            .collect();
        let thresholds = ThresholdSet::compute(
            &universe,
            &[
                (Feature::AvgOrderValue, 40),
                (Feature::AvgOrderValue, 75),
                (Feature::EngagementScore, 70),
            ],
        )
        .unwrap();

        let mid = thresholds.value(Feature::AvgOrderValue, 40).unwrap();
        let high = thresholds.value(Feature::AvgOrderValue, 75).unwrap();
        assert!(high > mid);
        assert!(thresholds.value(Feature::EngagementScore, 70).is_some());
        assert!(thresholds.value(Feature::ProfitabilityScore, 70).is_none());
        assert!(!thresholds.is_collapsed(Feature::AvgOrderValue));
    }

    #[test]
    fn test_zero_variance_feature_collapses() {
        let universe: Vec<UserRecord> = (0..100)
            .map(|i| user(&format!("u{i}"), 1000.0, i as f64 / 100.0, 0.5))
            .collect();
        let thresholds = ThresholdSet::compute(
            &universe,
            &[(Feature::AvgOrderValue, 40), (Feature::AvgOrderValue, 75)],
        )
        .unwrap();

        assert_eq!(thresholds.value(Feature::AvgOrderValue, 40), Some(1000.0));
        assert_eq!(thresholds.value(Feature::AvgOrderValue, 75), Some(1000.0));
        assert!(thresholds.is_collapsed(Feature::AvgOrderValue));
    }
}
