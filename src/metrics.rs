//! Append-only metrics log.
//!
//! Every worker reports [`MetricsRecord`]s through a cloneable [`MetricsSink`]
//! handle; a single dedicated writer task appends them to the CSV file, so
//! concurrent workers can never interleave partial rows.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const METRICS_HEADER: &str =
    "file,stage,src_size,out_size,delta,delta_pct,elapsed_ms,status,message";

/// Stage value for the terminal per-file summary row.
pub const STAGE_ORIGINAL: &str = "ORIGINAL";

/// Diagnostic messages are collapsed to one line and cut at this length.
const MESSAGE_LIMIT: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    Error,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// One row of the metrics log: a step outcome, or the ORIGINAL summary.
#[derive(Debug, Clone)]
pub struct MetricsRecord {
    /// Original input file the row refers to.
    pub file: PathBuf,
    /// Step name, or [`STAGE_ORIGINAL`].
    pub stage: String,
    pub src_size: Option<u64>,
    pub out_size: Option<u64>,
    pub elapsed: Duration,
    pub status: StepStatus,
    pub message: String,
}

impl MetricsRecord {
    /// Terminal summary row for a file: original size on both sides, zero
    /// delta, no elapsed time.
    pub fn original(file: PathBuf, size: Option<u64>) -> Self {
        Self {
            file,
            stage: STAGE_ORIGINAL.to_string(),
            src_size: size,
            out_size: size,
            elapsed: Duration::ZERO,
            status: StepStatus::Ok,
            message: String::new(),
        }
    }

    fn to_row(&self) -> String {
        let src = self.src_size.map(|v| v.to_string()).unwrap_or_default();
        let out = self.out_size.map(|v| v.to_string()).unwrap_or_default();

        let delta = match (self.src_size, self.out_size) {
            (Some(src), Some(out)) => (out as i64 - src as i64).to_string(),
            _ => String::new(),
        };

        // Empty when the source size is zero or unknown.
        let delta_pct = match (self.src_size, self.out_size) {
            (Some(src), Some(out)) if src > 0 => {
                format!("{:.2}", (out as f64 - src as f64) / src as f64 * 100.0)
            }
            _ => String::new(),
        };

        [
            sanitize(&self.file.to_string_lossy()),
            sanitize(&self.stage),
            src,
            out,
            delta,
            delta_pct,
            self.elapsed.as_millis().to_string(),
            self.status.as_str().to_string(),
            sanitize(&json_escape(&self.message)),
        ]
        .join(",")
    }
}

/// Fields may not contain literal commas; replace them rather than quote.
fn sanitize(field: &str) -> String {
    field.replace(',', " ")
}

/// JSON-string-escape a message (without the surrounding quotes).
fn json_escape(message: &str) -> String {
    let quoted = serde_json::to_string(message).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&quoted)
        .to_string()
}

/// Collapse diagnostic text to a single bounded line.
pub fn diagnostic(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match line.char_indices().nth(MESSAGE_LIMIT) {
        Some((idx, _)) => line[..idx].to_string(),
        None => line,
    }
}

/// Handle through which workers submit records to the writer task.
#[derive(Clone)]
pub struct MetricsSink {
    tx: mpsc::Sender<MetricsRecord>,
}

impl MetricsSink {
    /// Open (or create) the log at `path` and spawn the writer task.
    ///
    /// The header is written only when the file is new or empty. The returned
    /// handle completes once every sink clone is dropped and the channel has
    /// drained.
    pub async fn open(path: &Path) -> Result<(Self, JoinHandle<()>)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open metrics log: {:?}", path))?;

        let len = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat metrics log: {:?}", path))?
            .len();
        if len == 0 {
            file.write_all(format!("{METRICS_HEADER}\n").as_bytes())
                .await
                .context("Failed to write metrics header")?;
        }

        let (tx, mut rx) = mpsc::channel::<MetricsRecord>(256);
        let log_path = path.to_path_buf();
        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let row = record.to_row();
                if let Err(e) = file.write_all(format!("{row}\n").as_bytes()).await {
                    tracing::error!("Failed to append to {:?}: {}", log_path, e);
                }
            }
            if let Err(e) = file.flush().await {
                tracing::error!("Failed to flush {:?}: {}", log_path, e);
            }
        });

        Ok((Self { tx }, handle))
    }

    pub async fn record(&self, record: MetricsRecord) {
        if self.tx.send(record).await.is_err() {
            tracing::error!("Metrics writer is gone; dropping record");
        }
    }
}
