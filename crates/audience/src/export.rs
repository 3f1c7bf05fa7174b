//! Result export — per-segment scorecards to CSV and the full run envelope
//! to JSON.
//!
//! Column order mirrors the report consumed by the marketing side; the
//! assignment map travels inside the JSON envelope.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use retention_core::error::RetentionResult;
use retention_core::types::SegmentationRun;

const CSV_HEADER: &str = "segment_name,rules_applied,size,conversion_potential,profitability,\
lift_vs_control,strategic_fit,size_score,overall_score,valid,oversized,\
avg_aov,avg_engagement,avg_profitability";

/// Write `{prefix}.csv` and `{prefix}.json`; returns the paths written.
pub fn export_run(run: &SegmentationRun, prefix: &str) -> RetentionResult<Vec<PathBuf>> {
    let csv_path = PathBuf::from(format!("{prefix}.csv"));
    let json_path = PathBuf::from(format!("{prefix}.json"));

    write_segments_csv(run, &csv_path)?;
    write_run_json(run, &json_path)?;

    Ok(vec![csv_path, json_path])
}

/// Segment scorecard table, one row per active segment in rank order.
pub fn write_segments_csv(run: &SegmentationRun, path: &Path) -> RetentionResult<()> {
    let mut out = String::with_capacity(256 * (run.segments.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for segment in &run.segments {
        let s = &segment.scores;
        let p = &segment.profile;
        out.push_str(&format!(
            "{},{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{},{},{:.2},{:.3},{:.3}\n",
            csv_field(&segment.name),
            csv_field(&segment.rules_applied),
            segment.size,
            s.conversion_potential,
            s.profitability,
            s.lift_vs_control,
            s.strategic_fit,
            s.size_score,
            s.overall_score,
            segment.valid,
            segment.oversized,
            p.avg_order_value,
            p.avg_engagement,
            p.avg_profitability,
        ));
    }

    fs::write(path, out)?;
    info!(path = %path.display(), segments = run.segments.len(), "segment table exported");
    Ok(())
}

/// Full run envelope, including thresholds, merges, the assignment map, and
/// the validation report.
pub fn write_run_json(run: &SegmentationRun, path: &Path) -> RetentionResult<()> {
    let json = serde_json::to_string_pretty(run)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "run envelope exported");
    Ok(())
}

/// Quote a field when it carries CSV metacharacters (rule descriptions
/// contain commas).
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use retention_core::types::{
        AssignmentMap, MeceReport, Scorecard, ScoredSegment, SegmentProfile,
    };
    use uuid::Uuid;

    fn sample_run() -> SegmentationRun {
        let mut assignments = AssignmentMap::new();
        assignments.insert("user_00000".to_string(), "premium".to_string());
        SegmentationRun {
            run_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            population_size: 10,
            universe_size: 1,
            thresholds: vec![],
            segments: vec![ScoredSegment {
                name: "premium".to_string(),
                rules_applied: "avg_order_value >= 812.000, engagement_score >= 0.700"
                    .to_string(),
                priority: 1,
                size: 1,
                valid: false,
                oversized: false,
                profile: SegmentProfile::default(),
                scores: Scorecard::default(),
            }],
            merges: vec![],
            assignments,
            validation: MeceReport {
                passed: true,
                universe_size: 1,
                total_assigned: 1,
                overlaps: vec![],
                missing_user_ids: vec![],
                unexpected_user_ids: vec![],
            },
        }
    }

    #[test]
    fn test_csv_quotes_rule_descriptions() {
        let run = sample_run();
        let path = std::env::temp_dir().join(format!(
            "retention_express_export_test_{}.csv",
            std::process::id()
        ));
        write_segments_csv(&run, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let mut lines = written.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.starts_with("premium,\"avg_order_value >= 812.000,"));
        assert!(row.contains(",false,false,"));
    }

    #[test]
    fn test_json_round_trips_the_envelope() {
        let run = sample_run();
        let path = std::env::temp_dir().join(format!(
            "retention_express_export_test_{}.json",
            std::process::id()
        ));
        write_run_json(&run, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let parsed: SegmentationRun = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.run_id, run.run_id);
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.assignments.len(), 1);
        assert!(parsed.validation.passed);
    }
}
