//! Scores active segments along five dimensions and ranks them.
//!
//! Each sub-score is normalized to [0, 1] and blended with configured
//! weights:
//!   - conversion potential: mean engagement plus an order-recency factor
//!   - profitability: mean profitability plus capped mean AOV
//!   - lift vs control: a simulated heuristic estimate (there is no control
//!     group; this is never a measured lift)
//!   - strategic fit: business priority per segment name
//!   - size score: bell-shaped penalty around the optimal audience size

use tracing::debug;

use retention_core::config::ScoringConfig;
use retention_core::types::{Scorecard, ScoredSegment, SegmentProfile, UserRecord};
use retention_segmentation::Partition;

pub struct SegmentScorer {
    config: ScoringConfig,
}

impl SegmentScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score every active segment and return them ranked by overall score
    /// descending (rule priority breaks ties).
    pub fn score(&self, universe: &[UserRecord], partition: &Partition) -> Vec<ScoredSegment> {
        let mut scored: Vec<ScoredSegment> = partition
            .segments()
            .iter()
            .map(|segment| {
                let profile = self.profile(universe, &segment.members);
                let scores = self.scorecard(&segment.name, segment.members.len(), &profile);
                debug!(
                    segment = %segment.name,
                    size = segment.members.len(),
                    overall = scores.overall_score,
                    "segment scored"
                );
                ScoredSegment {
                    name: segment.name.clone(),
                    rules_applied: segment.rules_applied.clone(),
                    priority: segment.priority,
                    size: segment.members.len(),
                    valid: segment.valid,
                    oversized: segment.oversized,
                    profile,
                    scores,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.scores
                .overall_score
                .total_cmp(&a.scores.overall_score)
                .then(a.priority.cmp(&b.priority))
        });
        scored
    }

    /// Mean feature values over the segment's members. An empty segment
    /// (a legal outcome for the catch-all) profiles as all zeros.
    fn profile(&self, universe: &[UserRecord], members: &[usize]) -> SegmentProfile {
        if members.is_empty() {
            return SegmentProfile::default();
        }
        let n = members.len() as f64;
        let horizon = f64::from(self.config.recency_horizon_days);

        let mut profile = SegmentProfile::default();
        for &idx in members {
            let user = &universe[idx];
            profile.avg_order_value += user.avg_order_value;
            profile.avg_engagement += user.engagement_score;
            profile.avg_profitability += user.profitability_score;
            profile.avg_sessions_30d += f64::from(user.sessions_last_30d);
            profile.avg_cart_items += f64::from(user.num_cart_items);
            // Never-ordered members count at the horizon.
            profile.avg_days_since_order +=
                user.days_since_last_order.map_or(horizon, f64::from);
        }
        profile.avg_order_value /= n;
        profile.avg_engagement /= n;
        profile.avg_profitability /= n;
        profile.avg_sessions_30d /= n;
        profile.avg_cart_items /= n;
        profile.avg_days_since_order /= n;
        profile
    }

    fn scorecard(&self, name: &str, size: usize, profile: &SegmentProfile) -> Scorecard {
        let cfg = &self.config;

        let recency_factor =
            (1.0 - profile.avg_days_since_order / f64::from(cfg.recency_horizon_days)).max(0.0);
        let conversion_potential = 0.7 * profile.avg_engagement + 0.3 * recency_factor;

        let aov_norm = (profile.avg_order_value / cfg.aov_norm_cap).min(1.0);
        let profitability = 0.8 * profile.avg_profitability + 0.2 * aov_norm;

        // Simulated estimate only: engagement and capped AOV stand in for a
        // lift measurement that no experiment has produced.
        let lift_aov_norm = (profile.avg_order_value / cfg.lift_aov_cap).min(1.0);
        let lift_vs_control =
            (0.4 * profile.avg_engagement + 0.3 * lift_aov_norm + 0.1).min(1.0);

        let strategic_fit = cfg
            .strategic_fit
            .get(name)
            .copied()
            .unwrap_or(cfg.strategic_fit_floor);

        let optimal = cfg.optimal_segment_size as f64;
        let deviation = (size as f64 - optimal) / optimal;
        let size_score = (-deviation * deviation).exp().clamp(0.0, 1.0);

        let w = &cfg.weights;
        let overall_score = w.conversion_potential * conversion_potential
            + w.profitability * profitability
            + w.lift_vs_control * lift_vs_control
            + w.strategic_fit * strategic_fit
            + w.size_score * size_score;

        Scorecard {
            conversion_potential,
            profitability,
            lift_vs_control,
            strategic_fit,
            size_score,
            overall_score,
        }
    }
}
