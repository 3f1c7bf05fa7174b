//! Population import — reads an externally supplied population table.

use std::fs;
use std::path::Path;

use tracing::info;

use retention_core::error::RetentionResult;
use retention_core::types::UserRecord;

/// Read a population from a JSON array of user records.
pub fn read_population_json(path: &Path) -> RetentionResult<Vec<UserRecord>> {
    let raw = fs::read_to_string(path)?;
    let population: Vec<UserRecord> = serde_json::from_str(&raw)?;
    info!(path = %path.display(), users = population.len(), "population loaded");
    Ok(population)
}
