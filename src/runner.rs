//! Top-level run orchestration: discovery, scheduling, metrics shutdown.

use crate::config::Config;
use crate::discover::discover;
use crate::metrics::MetricsSink;
use crate::pipeline::{FileProcessor, Task};
use crate::scheduler::run_pool;
use crate::tools::ToolInvoker;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// What a completed run looked like.
#[derive(Debug)]
pub struct RunSummary {
    /// Number of files attempted.
    pub files: usize,
    /// Where the metrics rows went.
    pub log_path: PathBuf,
}

/// Execute one batch run to completion.
///
/// Fatal errors (unreadable input root, uncreatable output root or log)
/// propagate; per-file and per-step failures are contained by the workers
/// and surface only in the metrics log and diagnostics.
pub async fn run(mut config: Config, invoker: Arc<dyn ToolInvoker>) -> Result<RunSummary> {
    // Tasks carry absolute paths, so resolve the root once up front.
    config.input_dir = config
        .input_dir
        .canonicalize()
        .with_context(|| format!("Input directory not accessible: {:?}", config.input_dir))?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("Failed to create output directory: {:?}", config.output_dir))?;

    let tasks: Vec<Task> = discover(
        &config.input_dir,
        &config.selection,
        config.options.recursive,
    )
    .map(Task::new)
    .collect();

    tracing::info!(
        "Discovered {} files under {:?} ({} steps, concurrency {})",
        tasks.len(),
        config.input_dir,
        config.steps.len(),
        config.options.concurrency
    );
    if config.options.dry_run {
        tracing::info!("Dry run: outputs will be verbatim copies, no tools invoked");
    }

    let log_path = config.metrics_log_path();
    let (sink, writer) = MetricsSink::open(&log_path).await?;

    let files = tasks.len();
    let concurrency = config.options.concurrency;
    let processor = Arc::new(FileProcessor::new(Arc::new(config), invoker, sink));

    run_pool(tasks, concurrency, move |task| {
        let processor = Arc::clone(&processor);
        async move { processor.process(&task).await }
    })
    .await;

    // All sink handles are gone once the workers are done; wait for the
    // writer to drain so every row is on disk before we report completion.
    writer.await.context("Metrics writer failed")?;

    Ok(RunSummary { files, log_path })
}
