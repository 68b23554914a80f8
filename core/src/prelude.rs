use serde::Serialize;
use std::path::PathBuf;

/// Common error type for scenario generation.
#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("input read failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Outcome of one write-or-append call against a scenario file.
#[derive(Debug, Clone, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub appended: bool,
    /// Aircraft identifiers as rendered, after any collision renaming.
    pub aircraft: Vec<String>,
    pub lines: usize,
}
