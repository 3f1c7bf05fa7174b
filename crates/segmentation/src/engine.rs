//! Core segmentation engine — assigns every Universe member to exactly one
//! segment by consuming a shrinking candidate pool rule by rule.
//!
//! Mutual exclusivity and collective exhaustiveness hold by construction:
//! assigned members leave the pool and are never re-tested, and the final
//! catch-all rule absorbs whatever is left.

use tracing::{debug, info};

use retention_core::error::RetentionResult;
use retention_core::types::{AssignmentMap, UserRecord};

use crate::rules::{Rule, RuleSet};
use crate::thresholds::ThresholdSet;

/// One segment produced by partitioning. Members are indices into the
/// Universe slice the partition was computed over.
#[derive(Debug, Clone)]
pub struct PartitionSegment {
    pub name: String,
    pub rules_applied: String,
    pub priority: u32,
    pub members: Vec<usize>,
    /// Size within [min, max] after the size policy ran.
    pub valid: bool,
    /// Above the advisory ceiling.
    pub oversized: bool,
}

/// The full partition of one Universe.
#[derive(Debug, Clone)]
pub struct Partition {
    segments: Vec<PartitionSegment>,
}

impl Partition {
    pub fn segments(&self) -> &[PartitionSegment] {
        &self.segments
    }

    pub(crate) fn segments_mut(&mut self) -> &mut Vec<PartitionSegment> {
        &mut self.segments
    }

    /// Total members across all segments.
    pub fn assigned_count(&self) -> usize {
        self.segments.iter().map(|s| s.members.len()).sum()
    }

    /// user id -> segment name over the Universe the partition was built from.
    pub fn assignment_map(&self, universe: &[UserRecord]) -> AssignmentMap {
        let mut map = AssignmentMap::new();
        for segment in &self.segments {
            for &idx in &segment.members {
                map.insert(universe[idx].user_id.clone(), segment.name.clone());
            }
        }
        map
    }
}

/// Evaluates an ordered rule set against a Universe.
pub struct SegmentationEngine {
    rule_set: RuleSet,
}

impl SegmentationEngine {
    pub fn new(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Compute the threshold cuts this engine's rules require.
    pub fn compute_thresholds(&self, universe: &[UserRecord]) -> RetentionResult<ThresholdSet> {
        ThresholdSet::compute(universe, &self.rule_set.required_cuts())
    }

    /// Assign every Universe member to exactly one segment.
    ///
    /// Rules run strictly in order over the remaining pool; this ordering is
    /// a correctness requirement (rule i+1 depends on rule i's exclusions)
    /// and must stay sequential.
    pub fn partition(&self, universe: &[UserRecord], thresholds: &ThresholdSet) -> Partition {
        let mut remaining: Vec<usize> = (0..universe.len()).collect();
        let mut segments = Vec::with_capacity(self.rule_set.rules().len());

        for rule in self.rule_set.rules() {
            let (members, rest) = Self::split_matching(rule, &remaining, universe, thresholds);
            remaining = rest;

            debug!(
                segment = %rule.name,
                matched = members.len(),
                remaining = remaining.len(),
                "rule evaluated"
            );

            segments.push(PartitionSegment {
                name: rule.name.clone(),
                rules_applied: rule.predicate.describe(thresholds),
                priority: rule.priority,
                members,
                valid: true,
                oversized: false,
            });
        }

        // The catch-all consumed the pool.
        debug_assert!(remaining.is_empty());

        info!(
            universe = universe.len(),
            segments = segments.len(),
            "partition complete"
        );

        Partition { segments }
    }

    fn split_matching(
        rule: &Rule,
        pool: &[usize],
        universe: &[UserRecord],
        thresholds: &ThresholdSet,
    ) -> (Vec<usize>, Vec<usize>) {
        pool.iter()
            .copied()
            .partition(|&idx| rule.predicate.evaluate(&universe[idx], thresholds))
    }
}
