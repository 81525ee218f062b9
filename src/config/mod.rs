mod types;

pub use types::*;

use crate::tools::ToolKind;
use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    prepare_steps(&mut config);

    Ok(config)
}

/// Load config from default locations
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./batchpress.toml",
        "./config.toml",
        "~/.config/batchpress/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    anyhow::bail!(
        "No config file found. Pass one with --config or create ./batchpress.toml"
    )
}

/// Normalize selection/step data and resolve each step's tool capability.
///
/// Unknown step names resolve to `None` so a misconfigured step surfaces as a
/// per-file error row rather than a failed load.
fn prepare_steps(config: &mut Config) {
    for ext in &mut config.selection.extensions {
        *ext = ext.to_lowercase();
    }

    for step in &mut config.steps {
        for ext in &mut step.extensions {
            *ext = ext.to_lowercase();
        }
        step.capability = ToolKind::from_name(&step.name);
        if step.capability.is_none() {
            tracing::warn!(
                "Step '{}' does not match any known tool; it will fail per file",
                step.name
            );
        }
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.input_dir.as_os_str().is_empty() {
        anyhow::bail!("input_dir cannot be empty");
    }
    if config.output_dir.as_os_str().is_empty() {
        anyhow::bail!("output_dir cannot be empty");
    }
    if config.selection.extensions.is_empty() {
        anyhow::bail!("selection.extensions cannot be empty; no file would match");
    }

    for step in &config.steps {
        if step.enabled && step.extensions.is_empty() {
            tracing::warn!(
                "Step '{}' is enabled but matches no extensions; it will never run",
                step.name
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
        input_dir = "in"
        output_dir = "out"

        [selection]
        extensions = ["PNG", "jpg"]

        [[steps]]
        name = "pngquant"
        extensions = ["PNG"]
        suffix = "_q"
    "#;

    #[test]
    fn load_normalizes_extensions_and_resolves_capabilities() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.selection.extensions, vec!["png", "jpg"]);
        assert_eq!(config.steps[0].extensions, vec!["png"]);
        assert_eq!(config.steps[0].capability, Some(ToolKind::Pngquant));
        assert!(config.steps[0].enabled);
        assert_eq!(config.steps[0].profile, "default");
    }

    #[test]
    fn unknown_step_name_still_loads() {
        let file = write_config(
            r#"
            input_dir = "in"
            output_dir = "out"

            [selection]
            extensions = ["png"]

            [[steps]]
            name = "shrinkomatic"
            extensions = ["png"]
        "#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.steps[0].capability, None);
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let file = write_config(
            r#"
            input_dir = "in"
            output_dir = "out"
        "#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let file = write_config("input_dir = [not toml");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn metrics_log_defaults_under_output_root() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.metrics_log_path(),
            std::path::PathBuf::from("out/metrics.csv")
        );
    }
}
