//! Per-file pipeline execution.

mod executor;

pub use executor::FileProcessor;

use crate::metrics::{MetricsRecord, StepStatus};
use std::path::PathBuf;
use std::time::Duration;

/// One unit of work: an absolute input file path, fixed at discovery time.
#[derive(Debug, Clone)]
pub struct Task {
    pub path: PathBuf,
}

impl Task {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Result of running one pipeline step against one file.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Derived output path, whether or not the step managed to produce it.
    pub output: PathBuf,
    pub src_size: Option<u64>,
    /// Absent when the step failed before producing a measurable output.
    pub out_size: Option<u64>,
    pub elapsed: Duration,
    pub status: StepStatus,
    /// Single-line truncated diagnostic; empty on success.
    pub message: String,
}

impl StepOutcome {
    pub fn into_record(self, file: PathBuf, stage: &str) -> MetricsRecord {
        MetricsRecord {
            file,
            stage: stage.to_string(),
            src_size: self.src_size,
            out_size: self.out_size,
            elapsed: self.elapsed,
            status: self.status,
            message: self.message,
        }
    }
}
