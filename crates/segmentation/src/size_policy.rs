//! Segment size policy — merges undersized segments into the fallback
//! bucket and flags oversized ones.
//!
//! Merges only ever move members into the fixed fallback, never between two
//! other segments, so evaluation order cannot change the outcome. The
//! ceiling is advisory: splitting would need a new partition rule, so
//! oversized segments are flagged and kept.

use tracing::{info, warn};

use retention_core::config::SegmentationConfig;
use retention_core::error::{RetentionError, RetentionResult};
use retention_core::types::MergeAction;

use crate::engine::Partition;

#[derive(Debug, Clone)]
pub struct SizePolicy {
    min_segment_size: usize,
    max_segment_size: usize,
    fallback_segment: String,
}

impl SizePolicy {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            min_segment_size: config.min_segment_size,
            max_segment_size: config.max_segment_size,
            fallback_segment: config.fallback_segment.clone(),
        }
    }

    /// Enforce the size floor and flag the ceiling.
    ///
    /// Undersized non-fallback segments are drained into the fallback and
    /// dropped from the active list; the returned actions record what moved.
    pub fn apply(&self, partition: &mut Partition) -> RetentionResult<Vec<MergeAction>> {
        let segments = partition.segments_mut();

        if !segments.iter().any(|s| s.name == self.fallback_segment) {
            return Err(RetentionError::Config(format!(
                "fallback segment '{}' is not produced by the rule set",
                self.fallback_segment
            )));
        }

        let mut actions = Vec::new();
        let mut absorbed: Vec<usize> = Vec::new();

        segments.retain_mut(|segment| {
            if segment.name == self.fallback_segment {
                return true;
            }
            if segment.members.len() >= self.min_segment_size {
                return true;
            }
            info!(
                segment = %segment.name,
                size = segment.members.len(),
                min = self.min_segment_size,
                "segment below size floor, merging into fallback"
            );
            actions.push(MergeAction {
                segment: segment.name.clone(),
                size: segment.members.len(),
                merged_into: self.fallback_segment.clone(),
            });
            absorbed.append(&mut segment.members);
            false
        });

        for segment in segments.iter_mut() {
            if segment.name == self.fallback_segment {
                segment.members.append(&mut absorbed);
                // Keep assignment output deterministic after absorbs.
                segment.members.sort_unstable();
            }
            let size = segment.members.len();
            segment.oversized = size > self.max_segment_size;
            segment.valid = size <= self.max_segment_size
                && (size >= self.min_segment_size || segment.name == self.fallback_segment);
            if segment.oversized {
                warn!(
                    segment = %segment.name,
                    size,
                    max = self.max_segment_size,
                    "segment exceeds advisory ceiling"
                );
            }
        }

        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SegmentationEngine;
    use crate::rules::{RulePredicate, RuleSetBuilder};
    use retention_core::types::UserRecord;

    fn user(id: usize, days: Option<u32>) -> UserRecord {
        UserRecord {
            user_id: format!("user_{id:05}"),
            cart_abandon_days_ago: 1,
            days_since_last_order: days,
            avg_order_value: 100.0,
            sessions_last_30d: 3,
            num_cart_items: 1,
            engagement_score: 0.5,
            profitability_score: 0.5,
        }
    }

    fn config(min: usize, max: usize) -> SegmentationConfig {
        SegmentationConfig {
            min_segment_size: min,
            max_segment_size: max,
            recent_order_days: 30,
            fallback_segment: "other_bucket".to_string(),
        }
    }

    /// Two-rule partition: `recent` gets members with a recent order,
    /// everyone else falls into `other_bucket`.
    fn partition_with_recent(recent: usize, rest: usize) -> (Partition, Vec<UserRecord>) {
        let universe: Vec<UserRecord> = (0..recent)
            .map(|i| user(i, Some(5)))
            .chain((recent..recent + rest).map(|i| user(i, None)))
            .collect();
        let rule_set = RuleSetBuilder::new()
            .rule("recent", RulePredicate::OrderedWithinDays { days: 30 })
            .catch_all("other_bucket")
            .unwrap();
        let engine = SegmentationEngine::new(rule_set);
        let thresholds = engine.compute_thresholds(&universe).unwrap();
        let partition = engine.partition(&universe, &thresholds);
        (partition, universe)
    }

    #[test]
    fn test_undersized_segment_merges_into_fallback() {
        let (mut partition, universe) = partition_with_recent(499, 1000);
        let fallback_before = 1000;

        let policy = SizePolicy::new(&config(500, 20_000));
        let actions = policy.apply(&mut partition).unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].segment, "recent");
        assert_eq!(actions[0].size, 499);
        assert_eq!(actions[0].merged_into, "other_bucket");

        // Original segment is gone from the active list.
        assert_eq!(partition.segments().len(), 1);
        let fallback = &partition.segments()[0];
        assert_eq!(fallback.name, "other_bucket");
        assert_eq!(fallback.members.len(), fallback_before + 499);

        // Nothing was lost in the move.
        assert_eq!(partition.assigned_count(), universe.len());
    }

    #[test]
    fn test_segment_at_floor_is_kept() {
        let (mut partition, _) = partition_with_recent(500, 1000);

        let policy = SizePolicy::new(&config(500, 20_000));
        let actions = policy.apply(&mut partition).unwrap();

        assert!(actions.is_empty());
        assert_eq!(partition.segments().len(), 2);
        assert!(partition.segments().iter().all(|s| s.valid));
    }

    #[test]
    fn test_oversized_segment_flagged_not_split() {
        let (mut partition, _) = partition_with_recent(600, 50);

        let policy = SizePolicy::new(&config(10, 100));
        let actions = policy.apply(&mut partition).unwrap();

        assert!(actions.is_empty());
        let recent = partition
            .segments()
            .iter()
            .find(|s| s.name == "recent")
            .unwrap();
        assert!(recent.oversized);
        assert!(!recent.valid);
        assert_eq!(recent.members.len(), 600);
    }

    #[test]
    fn test_small_fallback_is_exempt_from_floor() {
        let (mut partition, _) = partition_with_recent(600, 3);

        let policy = SizePolicy::new(&config(500, 20_000));
        let actions = policy.apply(&mut partition).unwrap();

        assert!(actions.is_empty());
        let fallback = partition
            .segments()
            .iter()
            .find(|s| s.name == "other_bucket")
            .unwrap();
        assert_eq!(fallback.members.len(), 3);
        assert!(fallback.valid);
    }

    #[test]
    fn test_missing_fallback_is_a_config_error() {
        let (mut partition, _) = partition_with_recent(10, 10);
        let mut cfg = config(5, 100);
        cfg.fallback_segment = "does_not_exist".to_string();

        let policy = SizePolicy::new(&cfg);
        assert!(policy.apply(&mut partition).is_err());
    }
}
