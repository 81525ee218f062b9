//! Deterministic output-path derivation.
//!
//! Pure functions only: re-running a pipeline over the same inputs must
//! derive the same output paths so outputs overwrite instead of piling up.
//! Parent-directory creation is the caller's (idempotent) side effect.

use std::path::{Path, PathBuf};

/// Joiner used in place of path separators when outputs are flattened, so
/// `a/x.png` and `b/x.png` cannot collide in the output root.
const FLATTEN_JOINER: &str = "__";

/// Derive the output path for one input file and one pipeline step.
///
/// With `preserve_tree`, the input's directory structure under `input_root`
/// is mirrored below `output_root` and the filename is
/// `<stem><suffix>.<ext>`. Without it, every output lands directly in
/// `output_root` and the stem is the root-relative path with separators
/// collapsed into [`FLATTEN_JOINER`].
///
/// The extension is `forced_ext` when given, otherwise the input's own.
pub fn resolve_output(
    input: &Path,
    input_root: &Path,
    output_root: &Path,
    preserve_tree: bool,
    suffix: &str,
    forced_ext: Option<&str>,
) -> PathBuf {
    let rel = input
        .strip_prefix(input_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| {
            // Input outside the root: fall back to its bare file name.
            PathBuf::from(input.file_name().unwrap_or_default())
        });

    let ext = forced_ext
        .map(str::to_string)
        .or_else(|| rel.extension().map(|e| e.to_string_lossy().into_owned()));

    let rel_no_ext = rel.with_extension("");

    let (dir, stem) = if preserve_tree {
        let dir = match rel.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => output_root.join(parent),
            _ => output_root.to_path_buf(),
        };
        let stem = rel_no_ext
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (dir, stem)
    } else {
        let stem = rel_no_ext
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(FLATTEN_JOINER);
        (output_root.to_path_buf(), stem)
    };

    let file_name = match ext {
        Some(ext) if !ext.is_empty() => format!("{stem}{suffix}.{ext}"),
        _ => format!("{stem}{suffix}"),
    };

    dir.join(file_name)
}
