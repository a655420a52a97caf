//! Source manifests and their normalization into playlist entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use powerhour_common::error::{PowerHourError, PowerHourResult};
use powerhour_playlist_model::{extract_video_id, PlaylistItem, Warning, WarningKind};

use crate::scan::scan_directory;
use crate::table::{read_genre_map, read_video_table};

/// Where candidate items come from.
#[derive(Debug, Clone)]
pub enum Manifest {
    /// Recursive scan of a directory.
    Directory {
        root: PathBuf,
        /// Glob patterns matched case-insensitively against file names.
        patterns: Vec<String>,
        /// Allowed extensions, lowercase without the dot.
        extensions: Vec<String>,
        /// Optional `path,genre` table.
        genre_map: Option<PathBuf>,
    },

    /// Text file with one local path per line.
    PlaylistFile {
        path: PathBuf,
        genre_map: Option<PathBuf>,
    },

    /// Text file with one URL or bare video id per line.
    VideoList { path: PathBuf },

    /// CSV with an `id` or `url` column and optional metadata columns.
    VideoTable { path: PathBuf },
}

/// One normalized candidate and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub item: PlaylistItem,

    /// 1-based line (or discovery position) in the manifest.
    pub line: usize,
}

/// A manifest flattened into discovery order.
#[derive(Debug, Clone, Default)]
pub struct LoadedManifest {
    pub entries: Vec<ManifestEntry>,
    pub warnings: Vec<Warning>,
}

impl LoadedManifest {
    pub(crate) fn push(&mut self, item: PlaylistItem, line: usize) {
        self.entries.push(ManifestEntry { item, line });
    }

    pub(crate) fn skip(&mut self, line: usize, message: impl Into<String>) {
        let warning = Warning::new(WarningKind::SkippedRow { line }, message);
        tracing::warn!(line, warning = %warning.message, "Skipping manifest row");
        self.warnings.push(warning);
    }
}

impl Manifest {
    /// Path shown in diagnostics.
    pub fn location(&self) -> &Path {
        match self {
            Self::Directory { root, .. } => root,
            Self::PlaylistFile { path, .. } | Self::VideoList { path } | Self::VideoTable { path } => {
                path
            }
        }
    }

    /// Read the manifest into ordered entries.
    ///
    /// Fails when the manifest cannot be read, lacks required columns, or
    /// yields no usable entry at all. Individual bad rows become warnings.
    pub fn load(&self) -> PowerHourResult<LoadedManifest> {
        let mut loaded = match self {
            Self::Directory {
                root,
                patterns,
                extensions,
                genre_map,
            } => {
                let files = scan_directory(root, patterns, extensions)?;
                let mut loaded = LoadedManifest::default();
                for (idx, path) in files.into_iter().enumerate() {
                    loaded.push(PlaylistItem::local(path, idx), idx + 1);
                }
                apply_genre_map(&mut loaded, genre_map.as_deref())?;
                loaded
            }
            Self::PlaylistFile { path, genre_map } => {
                let mut loaded = read_playlist_file(path)?;
                apply_genre_map(&mut loaded, genre_map.as_deref())?;
                loaded
            }
            Self::VideoList { path } => read_video_list(path)?,
            Self::VideoTable { path } => read_video_table(path)?,
        };

        if loaded.entries.is_empty() {
            return Err(PowerHourError::input(format!(
                "Manifest {} contains no usable entries ({} row(s) skipped)",
                self.location().display(),
                loaded.warnings.len()
            )));
        }

        for (idx, entry) in loaded.entries.iter_mut().enumerate() {
            entry.item.order_index = idx;
        }

        tracing::debug!(
            manifest = %self.location().display(),
            entries = loaded.entries.len(),
            warnings = loaded.warnings.len(),
            "Manifest loaded"
        );
        Ok(loaded)
    }
}

pub(crate) fn read_text(path: &Path) -> PowerHourResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        PowerHourError::input(format!("Failed to read manifest {}: {e}", path.display()))
    })
}

/// Lines that carry content: trimmed, skipping blanks and `#` comments.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn read_playlist_file(path: &Path) -> PowerHourResult<LoadedManifest> {
    let text = read_text(path)?;
    let mut loaded = LoadedManifest::default();
    for (line_no, line) in content_lines(&text) {
        loaded.push(PlaylistItem::local(resolve_local_path(line), 0), line_no);
    }
    Ok(loaded)
}

fn read_video_list(path: &Path) -> PowerHourResult<LoadedManifest> {
    let text = read_text(path)?;
    let mut loaded = LoadedManifest::default();
    for (line_no, line) in content_lines(&text) {
        let id = extract_video_id(line);
        if id.is_empty() {
            loaded.skip(line_no, format!("no video id in {line:?}"));
            continue;
        }
        loaded.push(PlaylistItem::remote(id, 0), line_no);
    }
    Ok(loaded)
}

/// Expand `~`, make absolute, and canonicalize when the file exists.
pub(crate) fn resolve_local_path(raw: &str) -> PathBuf {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(raw),
    };
    canonical_or_absolute(&expanded)
}

pub(crate) fn canonical_or_absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn apply_genre_map(loaded: &mut LoadedManifest, genre_map: Option<&Path>) -> PowerHourResult<()> {
    let Some(map_path) = genre_map else {
        return Ok(());
    };
    let map: HashMap<PathBuf, Vec<String>> = read_genre_map(map_path)?;
    let mut tagged = 0usize;
    for entry in &mut loaded.entries {
        if let Some(path) = entry.item.source.local_path() {
            if let Some(tags) = map.get(path) {
                entry.item = entry.item.clone().with_genres(tags);
                tagged += 1;
            }
        }
    }
    tracing::debug!(
        map = %map_path.display(),
        mapped = map.len(),
        tagged,
        "Applied genre map"
    );
    Ok(())
}
