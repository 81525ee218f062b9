//! External tool capabilities, invocation, and detection.

use crate::config::ToolsConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
}

/// Closed set of tool capabilities the pipeline can drive.
///
/// Step names in the configuration are resolved to a variant once at load
/// time; everything downstream dispatches on the variant, never the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Lossy PNG palette quantizer.
    Pngquant,
    /// ImageMagick; the generalist. Accepts a subformat selector prefixed
    /// onto the output path ("PNG8:out.png").
    Magick,
    /// WebP encoder. Only ever emits .webp.
    Cwebp,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Pngquant, ToolKind::Magick, ToolKind::Cwebp];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "pngquant" => Some(Self::Pngquant),
            "magick" | "convert" => Some(Self::Magick),
            "cwebp" => Some(Self::Cwebp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pngquant => "pngquant",
            Self::Magick => "magick",
            Self::Cwebp => "cwebp",
        }
    }

    /// Output extension mandated by the tool, regardless of the input's.
    pub fn forced_extension(self) -> Option<&'static str> {
        match self {
            Self::Cwebp => Some("webp"),
            _ => None,
        }
    }

    /// Resolve the executable: an explicitly configured path wins, otherwise
    /// fall back to a PATH lookup.
    pub fn executable(self, tools: &ToolsConfig) -> Result<PathBuf, ToolError> {
        let configured = match self {
            Self::Pngquant => tools.pngquant_path.as_deref(),
            Self::Magick => tools.magick_path.as_deref(),
            Self::Cwebp => tools.cwebp_path.as_deref(),
        };
        if let Some(path) = configured {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
        }
        which::which(self.name()).map_err(|_| ToolError::NotFound(self.name().to_string()))
    }

    /// Assemble the full argument list around the profile's arguments.
    ///
    /// `output` already carries any format prefix stripped from the profile
    /// (see [`split_format_prefix`]).
    pub fn command_args(self, profile_args: &[String], input: &Path, output: &str) -> Vec<String> {
        let input = input.to_string_lossy().into_owned();
        let mut args = Vec::with_capacity(profile_args.len() + 4);
        match self {
            Self::Pngquant => {
                args.extend(profile_args.iter().cloned());
                args.push("--force".to_string());
                args.push("--output".to_string());
                args.push(output.to_string());
                args.push(input);
            }
            Self::Magick => {
                args.push(input);
                args.extend(profile_args.iter().cloned());
                args.push(output.to_string());
            }
            Self::Cwebp => {
                args.extend(profile_args.iter().cloned());
                args.push(input);
                args.push("-o".to_string());
                args.push(output.to_string());
            }
        }
        args
    }
}

/// Split a trailing-colon format-prefix token off a profile's argument list.
///
/// `["-colors", "64", "PNG8:"]` becomes `(["-colors", "64"], Some("PNG8:"))`;
/// the caller concatenates the prefix onto the output path string.
pub fn split_format_prefix(args: &[String]) -> (&[String], Option<&str>) {
    match args.last() {
        Some(last) if last.len() > 1 && last.ends_with(':') => {
            (&args[..args.len() - 1], Some(last.as_str()))
        }
        _ => (args, None),
    }
}

/// Result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub success: bool,
    pub elapsed: Duration,
    pub stderr: String,
}

/// Capability boundary for running external tools, so tests can substitute a
/// scripted fake for real process execution.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, program: &Path, args: &[String]) -> Invocation;
}

/// Spawns the tool as a child process and waits for it to exit.
pub struct ProcessInvoker;

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, program: &Path, args: &[String]) -> Invocation {
        tracing::debug!("Executing: {} {:?}", program.display(), args);

        let started = Instant::now();
        let result = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await;
        let elapsed = started.elapsed();

        match result {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let stderr = if !output.status.success() && stderr.trim().is_empty() {
                    format!("exit status {:?}", output.status.code())
                } else {
                    stderr
                };
                Invocation {
                    success: output.status.success(),
                    elapsed,
                    stderr,
                }
            }
            Err(e) => Invocation {
                success: false,
                elapsed,
                stderr: format!("failed to spawn {}: {}", program.display(), e),
            },
        }
    }
}

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "--version")
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let result = std::process::Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(name).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool the pipeline knows how to drive.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![
        check_tool("pngquant"),
        check_tool_with_arg("magick", "-version"),
        check_tool("cwebp"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive_and_closed() {
        assert_eq!(ToolKind::from_name("Pngquant"), Some(ToolKind::Pngquant));
        assert_eq!(ToolKind::from_name("convert"), Some(ToolKind::Magick));
        assert_eq!(ToolKind::from_name("zopfli"), None);
    }

    #[test]
    fn format_prefix_is_split_from_trailing_token() {
        let args = vec!["-colors".to_string(), "64".to_string(), "PNG8:".to_string()];
        let (rest, prefix) = split_format_prefix(&args);
        assert_eq!(rest, &args[..2]);
        assert_eq!(prefix, Some("PNG8:"));

        // A lone colon is not a prefix token.
        let args = vec![":".to_string()];
        let (rest, prefix) = split_format_prefix(&args);
        assert_eq!(rest.len(), 1);
        assert_eq!(prefix, None);

        let args = vec!["-strip".to_string()];
        let (_, prefix) = split_format_prefix(&args);
        assert_eq!(prefix, None);
    }

    #[test]
    fn pngquant_args_place_output_before_input() {
        let profile = vec!["--quality".to_string(), "60-80".to_string()];
        let args = ToolKind::Pngquant.command_args(&profile, Path::new("/in/a.png"), "/out/a_q.png");
        assert_eq!(
            args,
            vec!["--quality", "60-80", "--force", "--output", "/out/a_q.png", "/in/a.png"]
        );
    }

    #[test]
    fn magick_args_wrap_profile_between_input_and_output() {
        let profile = vec!["-colors".to_string(), "64".to_string()];
        let args = ToolKind::Magick.command_args(&profile, Path::new("/in/a.png"), "PNG8:/out/a.png");
        assert_eq!(args, vec!["/in/a.png", "-colors", "64", "PNG8:/out/a.png"]);
    }

    #[test]
    fn cwebp_args_use_output_flag() {
        let args = ToolKind::Cwebp.command_args(&[], Path::new("/in/a.jpg"), "/out/a.webp");
        assert_eq!(args, vec!["/in/a.jpg", "-o", "/out/a.webp"]);
    }

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool("nonexistent_tool_12345");
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[tokio::test]
    async fn spawn_failure_is_a_failed_invocation() {
        let invoker = ProcessInvoker;
        let result = invoker
            .invoke(Path::new("/nonexistent/tool/xyz"), &[])
            .await;
        assert!(!result.success);
        assert!(result.stderr.contains("failed to spawn"));
    }
}
