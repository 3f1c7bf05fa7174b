//! Retention Express — MECE cart-abandoner segmentation and scoring platform.
//!
//! Main entry point: builds the Universe, partitions it into mutually
//! exclusive, collectively exhaustive segments, scores and ranks them, then
//! validates and exports the result.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use retention_audience::{define_universe, export, loader, PopulationGenerator};
use retention_core::config::AppConfig;
use retention_core::types::SegmentationRun;
use retention_scoring::SegmentScorer;
use retention_segmentation::{RuleSet, SegmentationEngine, SizePolicy};
use retention_validation::{MeceValidator, SegmentMembership};

#[derive(Parser, Debug)]
#[command(name = "retention-express")]
#[command(about = "MECE cart-abandoner segmentation and scoring")]
#[command(version)]
struct Cli {
    /// Population JSON file; a synthetic population is generated when absent
    #[arg(long)]
    input: Option<PathBuf>,

    /// Synthetic population size (overrides config)
    #[arg(long, env = "RETENTION_EXPRESS__GENERATOR__USERS")]
    users: Option<usize>,

    /// Synthetic generator seed (overrides config)
    #[arg(long, env = "RETENTION_EXPRESS__GENERATOR__SEED")]
    seed: Option<u64>,

    /// Minimum viable segment size (overrides config)
    #[arg(long, env = "RETENTION_EXPRESS__SEGMENTATION__MIN_SEGMENT_SIZE")]
    min_segment_size: Option<usize>,

    /// Advisory maximum segment size (overrides config)
    #[arg(long, env = "RETENTION_EXPRESS__SEGMENTATION__MAX_SEGMENT_SIZE")]
    max_segment_size: Option<usize>,

    /// Export file prefix, e.g. `cart_abandoner_segments`
    #[arg(long)]
    export: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retention_express=info,retention_segmentation=info,retention_validation=info,retention_audience=info".into()),
        )
        .init();

    let cli = Cli::parse();

    info!("Retention Express starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(users) = cli.users {
        config.generator.users = users;
    }
    if let Some(seed) = cli.seed {
        config.generator.seed = seed;
    }
    if let Some(min) = cli.min_segment_size {
        config.segmentation.min_segment_size = min;
    }
    if let Some(max) = cli.max_segment_size {
        config.segmentation.max_segment_size = max;
    }

    // Fatal before any computation.
    config.validate()?;

    info!(
        min_segment_size = config.segmentation.min_segment_size,
        max_segment_size = config.segmentation.max_segment_size,
        abandon_window_days = config.universe.abandon_window_days,
        "Configuration loaded"
    );

    let population = match &cli.input {
        Some(path) => loader::read_population_json(path)?,
        None => PopulationGenerator::new(&config.generator).generate(),
    };

    let universe = define_universe(&population, &config.universe);

    let rule_set = RuleSet::default_cart_abandoner(config.segmentation.recent_order_days);
    let engine = SegmentationEngine::new(rule_set);

    let thresholds = engine.compute_thresholds(&universe)?;
    for cut in thresholds.cuts() {
        info!(feature = %cut.feature, percentile = cut.percentile, value = cut.value, "threshold");
    }

    let mut partition = engine.partition(&universe, &thresholds);
    let merges = SizePolicy::new(&config.segmentation).apply(&mut partition)?;
    let segments = SegmentScorer::new(config.scoring.clone()).score(&universe, &partition);

    let universe_ids: BTreeSet<String> = universe.iter().map(|u| u.user_id.clone()).collect();
    let memberships: Vec<SegmentMembership> = partition
        .segments()
        .iter()
        .map(|s| SegmentMembership {
            name: s.name.clone(),
            user_ids: s.members.iter().map(|&i| universe[i].user_id.clone()).collect(),
        })
        .collect();
    let validation = MeceValidator::new().ensure(&universe_ids, &memberships)?;

    let run = SegmentationRun {
        run_id: Uuid::new_v4(),
        computed_at: Utc::now(),
        population_size: population.len(),
        universe_size: universe.len(),
        thresholds: thresholds.cuts().to_vec(),
        segments,
        merges,
        assignments: partition.assignment_map(&universe),
        validation,
    };

    print_summary(&run);

    if let Some(prefix) = &cli.export {
        for path in export::export_run(&run, prefix)? {
            info!(path = %path.display(), "results exported");
        }
    }

    Ok(())
}

fn print_summary(run: &SegmentationRun) {
    println!();
    println!("Retention Express segmentation summary (run {})", run.run_id);
    println!(
        "Universe: {} of {} users abandoned a cart inside the window",
        run.universe_size, run.population_size
    );
    println!();
    println!(
        "{:<30} {:>8} {:>8} {:>6} {:>6}  Rules",
        "Segment", "Size", "Score", "Valid", "Over"
    );
    println!("{}", "-".repeat(100));
    for segment in &run.segments {
        println!(
            "{:<30} {:>8} {:>8.3} {:>6} {:>6}  {}",
            segment.name,
            segment.size,
            segment.scores.overall_score,
            segment.valid,
            segment.oversized,
            truncate(&segment.rules_applied, 48),
        );
    }

    if !run.merges.is_empty() {
        println!();
        for merge in &run.merges {
            println!(
                "merged: {} ({} users) -> {}",
                merge.segment, merge.size, merge.merged_into
            );
        }
    }

    println!();
    println!("Top segments by overall score:");
    for (rank, segment) in run.segments.iter().take(3).enumerate() {
        println!(
            "{}. {} - {:.3} ({} users)",
            rank + 1,
            segment.name,
            segment.scores.overall_score,
            segment.size
        );
    }
    println!();
    println!("MECE validation: {}", run.validation);
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        text.to_string()
    } else {
        format!("{}...", &text[..limit])
    }
}
