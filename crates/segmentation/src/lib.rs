//! MECE segmentation engine — percentile thresholds, ordered rule
//! evaluation over a shrinking candidate pool, and segment size policy.

pub mod engine;
pub mod rules;
pub mod size_policy;
pub mod thresholds;

pub use engine::{Partition, PartitionSegment, SegmentationEngine};
pub use rules::{Rule, RulePredicate, RuleSet, RuleSetBuilder};
pub use size_policy::SizePolicy;
pub use thresholds::ThresholdSet;
