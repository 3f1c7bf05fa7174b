//! MECE validator.
//!
//! Given correct construction upstream (sequential pool consumption plus an
//! unconditional catch-all) a violation here signals an implementation bug,
//! not a data condition. Failures therefore carry full diagnostics: the
//! offending segment pairs and the exact symmetric-difference ids, never a
//! bare boolean.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use retention_core::error::{RetentionError, RetentionResult};
use retention_core::types::{MeceReport, SegmentOverlap};

/// How many offending user ids an overlap report retains per pair.
const OVERLAP_SAMPLE_LIMIT: usize = 5;

/// A segment's name and resolved member ids, as the validator consumes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMembership {
    pub name: String,
    pub user_ids: Vec<String>,
}

pub struct MeceValidator;

impl MeceValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check exclusivity, exhaustiveness, and the count identity.
    pub fn validate(
        &self,
        universe_ids: &BTreeSet<String>,
        segments: &[SegmentMembership],
    ) -> MeceReport {
        let mut overlaps = Vec::new();
        let member_sets: Vec<HashSet<&str>> = segments
            .iter()
            .map(|s| s.user_ids.iter().map(String::as_str).collect())
            .collect();

        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let mut shared: Vec<&str> = member_sets[i]
                    .intersection(&member_sets[j])
                    .copied()
                    .collect();
                if shared.is_empty() {
                    continue;
                }
                shared.sort_unstable();
                overlaps.push(SegmentOverlap {
                    first: segments[i].name.clone(),
                    second: segments[j].name.clone(),
                    shared_count: shared.len(),
                    sample_user_ids: shared
                        .iter()
                        .take(OVERLAP_SAMPLE_LIMIT)
                        .map(|id| id.to_string())
                        .collect(),
                });
            }
        }

        let assigned: HashSet<&str> = member_sets.iter().flatten().copied().collect();
        let missing_user_ids: Vec<String> = universe_ids
            .iter()
            .filter(|id| !assigned.contains(id.as_str()))
            .cloned()
            .collect();
        let mut unexpected_user_ids: Vec<String> = assigned
            .iter()
            .filter(|id| !universe_ids.contains(**id))
            .map(|id| id.to_string())
            .collect();
        unexpected_user_ids.sort_unstable();

        let total_assigned: usize = segments.iter().map(|s| s.user_ids.len()).sum();
        let counts_match = total_assigned == universe_ids.len();

        let passed = overlaps.is_empty()
            && missing_user_ids.is_empty()
            && unexpected_user_ids.is_empty()
            && counts_match;

        let report = MeceReport {
            passed,
            universe_size: universe_ids.len(),
            total_assigned,
            overlaps,
            missing_user_ids,
            unexpected_user_ids,
        };

        if report.passed {
            info!(
                universe = report.universe_size,
                assigned = report.total_assigned,
                "MECE validation passed"
            );
        } else {
            error!(
                overlaps = report.overlaps.len(),
                missing = report.missing_user_ids.len(),
                unexpected = report.unexpected_user_ids.len(),
                "MECE validation FAILED"
            );
        }

        report
    }

    /// Validate and turn a failing report into an error.
    pub fn ensure(
        &self,
        universe_ids: &BTreeSet<String>,
        segments: &[SegmentMembership],
    ) -> RetentionResult<MeceReport> {
        let report = self.validate(universe_ids, segments);
        if report.passed {
            Ok(report)
        } else {
            Err(RetentionError::MeceViolation(report))
        }
    }
}

impl Default for MeceValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("user_{i:05}")).collect()
    }

    fn universe(n: usize) -> BTreeSet<String> {
        ids(0..n).into_iter().collect()
    }

    fn segment(name: &str, range: std::ops::Range<usize>) -> SegmentMembership {
        SegmentMembership {
            name: name.to_string(),
            user_ids: ids(range),
        }
    }

    #[test]
    fn test_clean_partition_passes() {
        let report = MeceValidator::new().validate(
            &universe(100),
            &[
                segment("premium", 0..25),
                segment("engaged", 25..70),
                segment("other_bucket", 70..100),
            ],
        );
        assert!(report.passed);
        assert!(report.is_exclusive());
        assert!(report.is_exhaustive());
        assert_eq!(report.total_assigned, 100);
    }

    #[test]
    fn test_empty_segments_are_legal() {
        let report = MeceValidator::new().validate(
            &universe(10),
            &[segment("premium", 0..0), segment("other_bucket", 0..10)],
        );
        assert!(report.passed);
    }

    #[test]
    fn test_overlap_reports_the_offending_pair() {
        let report = MeceValidator::new().validate(
            &universe(100),
            &[
                segment("premium", 0..30),
                segment("engaged", 25..70),
                segment("other_bucket", 70..100),
            ],
        );
        assert!(!report.passed);
        assert!(!report.is_exclusive());
        assert_eq!(report.overlaps.len(), 1);

        let overlap = &report.overlaps[0];
        assert_eq!(overlap.first, "premium");
        assert_eq!(overlap.second, "engaged");
        assert_eq!(overlap.shared_count, 5);
        assert_eq!(overlap.sample_user_ids[0], "user_00025");
    }

    #[test]
    fn test_gap_reports_missing_ids() {
        let report = MeceValidator::new().validate(
            &universe(100),
            &[segment("premium", 0..40), segment("other_bucket", 50..100)],
        );
        assert!(!report.passed);
        assert!(!report.is_exhaustive());
        assert_eq!(report.missing_user_ids, ids(40..50));
        assert!(report.unexpected_user_ids.is_empty());
    }

    #[test]
    fn test_alien_ids_reported_as_unexpected() {
        let report = MeceValidator::new().validate(
            &universe(50),
            &[segment("premium", 0..50), segment("other_bucket", 90..92)],
        );
        assert!(!report.passed);
        assert_eq!(report.unexpected_user_ids, ids(90..92));
    }

    #[test]
    fn test_ensure_surfaces_diagnostics_in_error() {
        let err = MeceValidator::new()
            .ensure(
                &universe(10),
                &[segment("premium", 0..5), segment("other_bucket", 0..10)],
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("overlapping"));
        assert!(message.contains("premium"));
    }
}
