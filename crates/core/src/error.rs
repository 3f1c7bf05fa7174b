use thiserror::Error;

use crate::types::MeceReport;

pub type RetentionResult<T> = Result<T, RetentionError>;

#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Universe is empty: no users abandoned a cart inside the window")]
    EmptyUniverse,

    #[error("MECE validation failed: {0}")]
    MeceViolation(MeceReport),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
