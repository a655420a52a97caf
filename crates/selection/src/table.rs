//! Tabular manifests: genre maps and video tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use powerhour_common::error::{PowerHourError, PowerHourResult};
use powerhour_playlist_model::{extract_video_id, parse_timecode, Cue, PlaylistItem};

use crate::manifest::{resolve_local_path, LoadedManifest};

const ID_HEADERS: &[&str] = &["id", "video_id", "youtube_id"];
const URL_HEADERS: &[&str] = &["url", "link", "youtube_url"];
const TITLE_HEADERS: &[&str] = &["title", "name", "track"];
const GENRE_HEADERS: &[&str] = &["genre", "genres", "tag", "tags"];
const CHORUS_HEADERS: &[&str] = &["chorus", "chorus_at", "chorus_time"];
const START_HEADERS: &[&str] = &["start", "start_at", "offset", "clip_start", "start_seconds"];

/// Column positions resolved from a header row.
#[derive(Debug, Default)]
struct Columns {
    id: Option<usize>,
    url: Option<usize>,
    title: Option<usize>,
    genre: Option<usize>,
    chorus: Option<usize>,
    start: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| lowered.iter().position(|h| h == alias))
        };
        Self {
            id: find(ID_HEADERS),
            url: find(URL_HEADERS),
            title: find(TITLE_HEADERS),
            genre: find(GENRE_HEADERS),
            chorus: find(CHORUS_HEADERS),
            start: find(START_HEADERS),
        }
    }
}

fn field(record: &StringRecord, column: Option<usize>) -> &str {
    column.and_then(|idx| record.get(idx)).unwrap_or("").trim()
}

fn reader_for(path: &Path) -> PowerHourResult<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| PowerHourError::input(format!("Failed to read table {}: {e}", path.display())))
}

fn headers_of(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> PowerHourResult<StringRecord> {
    reader.headers().cloned().map_err(|e| {
        PowerHourError::input(format!("Failed to read header row of {}: {e}", path.display()))
    })
}

fn record_line(record: &StringRecord, fallback: usize) -> usize {
    record
        .position()
        .map(|pos| pos.line() as usize)
        .unwrap_or(fallback)
}

/// Read a video table: one row per item, identified by `id` or `url`.
///
/// A table with neither column is rejected outright. Rows without a usable
/// identifier are skipped with a warning.
pub fn read_video_table(path: &Path) -> PowerHourResult<LoadedManifest> {
    let mut reader = reader_for(path)?;
    let headers = headers_of(&mut reader, path)?;
    let columns = Columns::from_headers(&headers);
    if columns.id.is_none() && columns.url.is_none() {
        return Err(PowerHourError::input(format!(
            "Table {} needs an id or url column (found: {})",
            path.display(),
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    }

    let mut loaded = LoadedManifest::default();
    for (row_idx, result) in reader.records().enumerate() {
        // Header is line 1, so data rows start at line 2.
        let fallback_line = row_idx + 2;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err
                    .position()
                    .map(|pos| pos.line() as usize)
                    .unwrap_or(fallback_line);
                loaded.skip(line, format!("unreadable row: {err}"));
                continue;
            }
        };
        let line = record_line(&record, fallback_line);

        let id = field(&record, columns.id);
        let reference = if id.is_empty() {
            field(&record, columns.url)
        } else {
            id
        };
        let video_id = extract_video_id(reference);
        if video_id.is_empty() {
            loaded.skip(line, "row has no id or url");
            continue;
        }

        let cue = Cue {
            start_secs: parse_timecode(field(&record, columns.start)),
            chorus_secs: parse_timecode(field(&record, columns.chorus)),
        };
        let item = PlaylistItem::remote(video_id, 0)
            .with_title(field(&record, columns.title))
            .with_genre_field(field(&record, columns.genre))
            .with_cue(cue);
        loaded.push(item, line);
    }
    Ok(loaded)
}

/// Read a `path,genre` table into canonical path -> tags.
pub fn read_genre_map(path: &Path) -> PowerHourResult<HashMap<PathBuf, Vec<String>>> {
    let mut reader = reader_for(path)?;
    let headers = headers_of(&mut reader, path)?;
    let position = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let (Some(path_col), Some(genre_col)) = (position("path"), position("genre")) else {
        return Err(PowerHourError::input(format!(
            "Genre map {} needs a path,genre header row",
            path.display()
        )));
    };

    let mut map = HashMap::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(map = %path.display(), error = %err, "Skipping unreadable genre row");
                continue;
            }
        };
        let file = field(&record, Some(path_col));
        let genres: Vec<String> = field(&record, Some(genre_col))
            .split('|')
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        if file.is_empty() || genres.is_empty() {
            continue;
        }
        map.insert(resolve_local_path(file), genres);
    }
    Ok(map)
}
