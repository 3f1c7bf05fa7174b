use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One member of the input population.
///
/// Records arrive from an external tabular collaborator (synthetic generator,
/// warehouse extract, CSV import) and are immutable for the duration of a run.
/// `engagement_score` and `profitability_score` are on the [0, 1] scale of the
/// upstream dataset; `days_since_last_order` is `None` for users who have
/// never placed an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub cart_abandon_days_ago: u32,
    pub days_since_last_order: Option<u32>,
    pub avg_order_value: f64,
    pub sessions_last_30d: u32,
    pub num_cart_items: u32,
    pub engagement_score: f64,
    pub profitability_score: f64,
}

/// A numeric feature that percentile thresholds can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AvgOrderValue,
    EngagementScore,
    ProfitabilityScore,
}

impl Feature {
    fn key(self) -> &'static str {
        match self {
            Self::AvgOrderValue => "avg_order_value",
            Self::EngagementScore => "engagement_score",
            Self::ProfitabilityScore => "profitability_score",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl UserRecord {
    /// Value of the given feature for this record.
    pub fn feature(&self, feature: Feature) -> f64 {
        match feature {
            Feature::AvgOrderValue => self.avg_order_value,
            Feature::EngagementScore => self.engagement_score,
            Feature::ProfitabilityScore => self.profitability_score,
        }
    }
}

/// One computed percentile cut point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdCut {
    pub feature: Feature,
    pub percentile: u8,
    pub value: f64,
}

/// Default segment names used by the six-rule hierarchy. Custom rule sets may
/// introduce their own names; strategic-fit configuration is keyed by these.
pub mod segment_names {
    pub const HIGH_AOV_PREMIUM: &str = "high_aov_premium";
    pub const MED_AOV_HIGH_ENGAGEMENT: &str = "med_aov_high_engagement";
    pub const MED_AOV_MED_ENG_HIGH_PROFIT: &str = "med_aov_med_eng_high_profit";
    pub const LOW_AOV_HIGH_ENGAGEMENT: &str = "low_aov_high_engagement";
    pub const RECENT_CUSTOMERS: &str = "recent_customers";
    pub const OTHER_BUCKET: &str = "other_bucket";
}

/// Mean feature values across one segment's members.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub avg_order_value: f64,
    pub avg_engagement: f64,
    pub avg_profitability: f64,
    pub avg_sessions_30d: f64,
    pub avg_cart_items: f64,
    /// Mean days since last order, with never-ordered members counted at the
    /// configured recency horizon.
    pub avg_days_since_order: f64,
}

/// The five sub-scores plus the weighted total, all in [0, 1].
///
/// `lift_vs_control` is a deterministic heuristic estimate, not a measured
/// experiment result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scorecard {
    pub conversion_potential: f64,
    pub profitability: f64,
    pub lift_vs_control: f64,
    pub strategic_fit: f64,
    pub size_score: f64,
    pub overall_score: f64,
}

/// A segment after scoring: the per-segment record handed to export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSegment {
    pub name: String,
    pub rules_applied: String,
    pub priority: u32,
    pub size: usize,
    pub valid: bool,
    pub oversized: bool,
    pub profile: SegmentProfile,
    pub scores: Scorecard,
}

/// Record of an undersized segment folded into the fallback bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeAction {
    pub segment: String,
    pub size: usize,
    pub merged_into: String,
}

/// user id -> segment name. Ordered so serialized output is deterministic.
pub type AssignmentMap = BTreeMap<String, String>;

/// Overlap between two segments that should have been disjoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentOverlap {
    pub first: String,
    pub second: String,
    pub shared_count: usize,
    /// Up to a handful of offending user ids, for diagnostics.
    pub sample_user_ids: Vec<String>,
}

/// Outcome of the MECE validation pass.
///
/// A failing report always carries enough detail to diagnose the violation:
/// the overlapping pairs, and the ids missing from or alien to the Universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeceReport {
    pub passed: bool,
    pub universe_size: usize,
    pub total_assigned: usize,
    pub overlaps: Vec<SegmentOverlap>,
    pub missing_user_ids: Vec<String>,
    pub unexpected_user_ids: Vec<String>,
}

impl MeceReport {
    pub fn is_exclusive(&self) -> bool {
        self.overlaps.is_empty()
    }

    pub fn is_exhaustive(&self) -> bool {
        self.missing_user_ids.is_empty() && self.unexpected_user_ids.is_empty()
    }
}

impl std::fmt::Display for MeceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passed {
            return write!(
                f,
                "MECE ok: {} users assigned across universe of {}",
                self.total_assigned, self.universe_size
            );
        }
        write!(
            f,
            "{} overlapping pair(s), {} missing user(s), {} unexpected user(s), \
             {} assigned of {} in universe",
            self.overlaps.len(),
            self.missing_user_ids.len(),
            self.unexpected_user_ids.len(),
            self.total_assigned,
            self.universe_size
        )?;
        for o in &self.overlaps {
            write!(
                f,
                "; {} and {} share {} user(s) e.g. {:?}",
                o.first, o.second, o.shared_count, o.sample_user_ids
            )?;
        }
        Ok(())
    }
}

/// Everything a run produces, as handed to the export collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationRun {
    pub run_id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub population_size: usize,
    pub universe_size: usize,
    pub thresholds: Vec<ThresholdCut>,
    /// Active segments, ranked by overall score descending.
    pub segments: Vec<ScoredSegment>,
    pub merges: Vec<MergeAction>,
    pub assignments: AssignmentMap,
    pub validation: MeceReport,
}
