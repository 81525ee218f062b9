use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Root directory scanned for input files.
    pub input_dir: PathBuf,

    /// Root directory that receives processed outputs (and the metrics log).
    pub output_dir: PathBuf,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub steps: Vec<Step>,

    /// Named argument profiles, keyed by tool name then profile name.
    #[serde(default)]
    pub profiles: HashMap<String, HashMap<String, Profile>>,
}

impl Config {
    /// Where metrics rows are appended for this run.
    pub fn metrics_log_path(&self) -> PathBuf {
        self.logging
            .log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("metrics.csv"))
    }

    /// Look up the argument list for a tool/profile pair.
    pub fn profile_args(&self, tool: &str, profile: &str) -> Option<&[String]> {
        self.profiles
            .get(tool)
            .and_then(|p| p.get(profile))
            .map(|p| p.args.as_slice())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Lowercase extensions (without dot) that are eligible for processing.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Files whose root-relative path contains any of these substrings are
    /// skipped. Matching is case-sensitive.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptionsConfig {
    /// Walk the input tree recursively, or only its direct entries.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Mirror the input directory structure under the output root instead of
    /// flattening all outputs into it.
    #[serde(default = "default_true")]
    pub preserve_tree: bool,

    /// Copy inputs verbatim instead of invoking external tools.
    #[serde(default)]
    pub dry_run: bool,

    /// Number of concurrent workers (minimum 1).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            recursive: default_true(),
            preserve_tree: default_true(),
            dry_run: false,
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Write one metrics row per executed step. The terminal ORIGINAL row per
    /// file is always written.
    #[serde(default = "default_true")]
    pub per_step_rows: bool,

    /// Metrics log location. Defaults to `metrics.csv` under the output root.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            per_step_rows: default_true(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub pngquant_path: Option<PathBuf>,

    #[serde(default)]
    pub magick_path: Option<PathBuf>,

    #[serde(default)]
    pub cwebp_path: Option<PathBuf>,
}

/// One pipeline step: a named transformation applied independently to every
/// matching input file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    /// Tool identifier ("pngquant", "magick", "cwebp"). An unrecognized name
    /// is reported per file at execution time, not at config load.
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lowercase input extensions this step applies to.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Appended to the output file's stem.
    #[serde(default)]
    pub suffix: String,

    /// Name of the argument profile to select for this step's tool.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Capability resolved once at config load; `None` for unknown names.
    #[serde(skip)]
    pub capability: Option<ToolKind>,
}

fn default_profile() -> String {
    "default".to_string()
}

impl Step {
    /// Whether this step applies to a file with the given lowercase extension.
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub args: Vec<String>,
}
