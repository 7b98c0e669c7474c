use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the benchmark pipeline.
///
/// Every variant names the workload it belongs to so the message alone is
/// enough to tell which benchmark failed and at which stage.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The external executor failed while running a workload.
    #[error("workload '{workload}' failed during run {run} of {run_times}")]
    Executor {
        workload: String,
        run: u32,
        run_times: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A configured workload has no executor registered under its name.
    #[error("no executor registered for workload '{workload}'")]
    MissingExecutor { workload: String },

    /// Creating the results directory or writing the artifact failed.
    #[error("failed to persist results for workload '{workload}' to {}", path.display())]
    Persistence {
        workload: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Aggregation was asked to pick from zero runs.
    #[error("workload '{workload}' produced no runs to aggregate")]
    EmptyRuns { workload: String },

    /// A run record is missing its sort key or the value is not numeric.
    #[error("run {run} of workload '{workload}' has no numeric value at '{key}'")]
    InvalidScore {
        workload: String,
        run: usize,
        key: String,
    },

    /// Settings failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BenchError {
    /// Workload the failure belongs to, if any.
    pub fn workload(&self) -> Option<&str> {
        match self {
            BenchError::Executor { workload, .. }
            | BenchError::MissingExecutor { workload }
            | BenchError::Persistence { workload, .. }
            | BenchError::EmptyRuns { workload }
            | BenchError::InvalidScore { workload, .. } => Some(workload),
            BenchError::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
