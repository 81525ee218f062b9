use super::{StepOutcome, Task};
use crate::config::{Config, Step};
use crate::metrics::{diagnostic, MetricsRecord, MetricsSink, StepStatus};
use crate::paths::resolve_output;
use crate::tools::{split_format_prefix, ToolInvoker};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs the full pipeline against single files and reports metrics.
///
/// Steps are independent transformations: every step reads the original
/// input file, never a previous step's output. One step failing does not
/// stop the remaining steps for that file.
pub struct FileProcessor {
    config: Arc<Config>,
    invoker: Arc<dyn ToolInvoker>,
    sink: MetricsSink,
}

impl FileProcessor {
    pub fn new(config: Arc<Config>, invoker: Arc<dyn ToolInvoker>, sink: MetricsSink) -> Self {
        Self {
            config,
            invoker,
            sink,
        }
    }

    /// Run every enabled, extension-matching step against `task`, then emit
    /// the terminal ORIGINAL row.
    pub async fn process(&self, task: &Task) -> Result<()> {
        let src_size = tokio::fs::metadata(&task.path).await.ok().map(|m| m.len());
        let ext = task
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        for step in &self.config.steps {
            if !step.enabled || !step.matches_extension(&ext) {
                continue;
            }

            let outcome = self.run_step(task, step, src_size).await;
            match outcome.status {
                StepStatus::Ok => tracing::info!(
                    "{}: {} -> {:?} ({} ms)",
                    step.name,
                    task.path.display(),
                    outcome.output,
                    outcome.elapsed.as_millis()
                ),
                StepStatus::Error => tracing::warn!(
                    "{}: {} failed: {}",
                    step.name,
                    task.path.display(),
                    outcome.message
                ),
            }

            if self.config.logging.per_step_rows {
                self.sink
                    .record(outcome.into_record(task.path.clone(), &step.name))
                    .await;
            }
        }

        self.sink
            .record(MetricsRecord::original(task.path.clone(), src_size))
            .await;

        Ok(())
    }

    /// Execute one step: resolve the output path, ensure its parent exists,
    /// then copy (dry run) or invoke the tool, and classify the result.
    async fn run_step(&self, task: &Task, step: &Step, src_size: Option<u64>) -> StepOutcome {
        let forced_ext = step.capability.and_then(|t| t.forced_extension());
        let output = resolve_output(
            &task.path,
            &self.config.input_dir,
            &self.config.output_dir,
            self.config.options.preserve_tree,
            &step.suffix,
            forced_ext,
        );

        let fail = |output: PathBuf, elapsed: Duration, message: String| StepOutcome {
            output,
            src_size,
            out_size: None,
            elapsed,
            status: StepStatus::Error,
            message: diagnostic(&message),
        };

        if let Some(parent) = output.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return fail(
                    output.clone(),
                    Duration::ZERO,
                    format!("cannot create {:?}: {}", parent, e),
                );
            }
        }

        if self.config.options.dry_run {
            let started = Instant::now();
            return match tokio::fs::copy(&task.path, &output).await {
                Ok(bytes) => StepOutcome {
                    output,
                    src_size,
                    out_size: Some(bytes),
                    elapsed: started.elapsed(),
                    status: StepStatus::Ok,
                    message: String::new(),
                },
                Err(e) => fail(output, started.elapsed(), format!("dry-run copy failed: {}", e)),
            };
        }

        let Some(tool) = step.capability else {
            return fail(
                output,
                Duration::ZERO,
                format!("unknown step '{}': no such tool capability", step.name),
            );
        };

        let Some(profile_args) = self.config.profile_args(tool.name(), &step.profile) else {
            return fail(
                output,
                Duration::ZERO,
                format!("unknown profile '{}' for tool '{}'", step.profile, tool.name()),
            );
        };

        let executable = match tool.executable(&self.config.tools) {
            Ok(path) => path,
            Err(e) => return fail(output, Duration::ZERO, e.to_string()),
        };

        // A trailing-colon token in the profile is a subformat selector; it
        // rides on the output path string, not the argument list.
        let (profile_args, prefix) = split_format_prefix(profile_args);
        let output_arg = match prefix {
            Some(prefix) => format!("{}{}", prefix, output.to_string_lossy()),
            None => output.to_string_lossy().into_owned(),
        };
        let args = tool.command_args(profile_args, &task.path, &output_arg);

        let invocation = self.invoker.invoke(&executable, &args).await;
        if !invocation.success {
            return fail(output, invocation.elapsed, invocation.stderr);
        }

        match tokio::fs::metadata(&output).await {
            Ok(meta) => StepOutcome {
                output,
                src_size,
                out_size: Some(meta.len()),
                elapsed: invocation.elapsed,
                status: StepStatus::Ok,
                message: String::new(),
            },
            Err(e) => fail(
                output.clone(),
                invocation.elapsed,
                format!("output not measurable {:?}: {}", output, e),
            ),
        }
    }
}
