//! Recursive directory discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use powerhour_common::error::{PowerHourError, PowerHourResult};

use crate::manifest::canonical_or_absolute;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Find video files under `root`.
///
/// Files must carry an allowed extension (case-insensitive). They are then
/// collected pattern by pattern, in sorted walk order, matching each glob
/// against the file name (or the relative path when the pattern contains a
/// `/`). When no pattern matches anything, every allowed file is returned.
/// Results are canonicalized and deduplicated.
pub fn scan_directory(
    root: &Path,
    patterns: &[String],
    extensions: &[String],
) -> PowerHourResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(PowerHourError::input(format!(
            "Input directory {} does not exist or is not a directory",
            root.display()
        )));
    }

    let compiled = patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| PowerHourError::input(format!("Invalid glob pattern {p:?}: {e}")))
        })
        .collect::<PowerHourResult<Vec<_>>>()?;

    let allowed: HashSet<String> = extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), &allowed) {
            continue;
        }
        candidates.push(entry.into_path());
    }

    let mut matched = Vec::new();
    for pattern in &compiled {
        for path in &candidates {
            if pattern_matches(pattern, root, path) {
                matched.push(path.clone());
            }
        }
    }
    if matched.is_empty() {
        tracing::debug!(
            root = %root.display(),
            candidates = candidates.len(),
            "No pattern matched; falling back to every recognized video file"
        );
        matched = candidates;
    }

    let mut seen = HashSet::new();
    let files: Vec<PathBuf> = matched
        .into_iter()
        .map(|path| canonical_or_absolute(&path))
        .filter(|path| seen.insert(path.clone()))
        .collect();

    tracing::info!(root = %root.display(), files = files.len(), "Scanned input directory");
    Ok(files)
}

fn has_allowed_extension(path: &Path, allowed: &HashSet<String>) -> bool {
    path.extension()
        .map(|ext| allowed.contains(&ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or(false)
}

fn pattern_matches(pattern: &Pattern, root: &Path, path: &Path) -> bool {
    if pattern.as_str().contains('/') {
        let relative = path.strip_prefix(root).unwrap_or(path);
        return pattern.matches_path_with(relative, MATCH_OPTIONS);
    }
    path.file_name()
        .map(|name| pattern.matches_with(&name.to_string_lossy(), MATCH_OPTIONS))
        .unwrap_or(false)
}
