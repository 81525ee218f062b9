//! Input file discovery.

use crate::config::SelectionConfig;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily enumerate the files under `root` that the pipeline should process.
///
/// Directories are only descended into when `recursive` is set. A file is
/// selected when its lowercase extension is in the allow-list and its
/// root-relative path contains none of the exclude substrings (matched
/// case-sensitively).
pub fn discover<'a>(
    root: &'a Path,
    selection: &'a SelectionConfig,
    recursive: bool,
) -> impl Iterator<Item = PathBuf> + 'a {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(root)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(move |path| is_selected(path, root, selection))
}

fn is_selected(path: &Path, root: &Path, selection: &SelectionConfig) -> bool {
    let ext = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return false,
    };
    if !selection.extensions.iter().any(|e| *e == ext) {
        return false;
    }

    let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
    !selection.exclude.iter().any(|pat| rel.contains(pat.as_str()))
}
