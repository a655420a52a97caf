//! Playlist items.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where an item's media comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ItemSource {
    /// A file on the local filesystem.
    Local(PathBuf),

    /// An externally hosted video identifier.
    Remote(String),
}

impl ItemSource {
    /// Text the path-based genre strategy searches.
    pub fn search_text(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(id) => id.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Local(path) => path.as_os_str().is_empty(),
            Self::Remote(id) => id.trim().is_empty(),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::Local(_) => None,
            Self::Remote(id) => Some(id),
        }
    }
}

impl std::fmt::Display for ItemSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(id) => write!(f, "{id}"),
        }
    }
}

/// Optional per-item positions read from a manifest (seconds into the source).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Explicit start position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_secs: Option<f64>,

    /// Position of the chorus; playback starts a little before it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chorus_secs: Option<f64>,
}

impl Cue {
    /// Resolve the playback start for this item.
    ///
    /// A chorus cue wins over an explicit start; `fallback` applies when
    /// neither is present. The result is never negative.
    pub fn resolve_start(&self, pre_chorus: f64, fallback: f64) -> f64 {
        let start = if let Some(chorus) = self.chorus_secs {
            chorus - pre_chorus
        } else if let Some(start) = self.start_secs {
            start
        } else {
            fallback
        };
        start.max(0.0)
    }
}

/// One playable entry of a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub source: ItemSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Lowercase tags, possibly empty.
    #[serde(default)]
    pub genres: BTreeSet<String>,

    /// Position in the playlist. Assigned at discovery, renumbered once the
    /// final order is known.
    pub order_index: usize,

    #[serde(default)]
    pub cue: Cue,
}

impl PlaylistItem {
    pub fn new(source: ItemSource, order_index: usize) -> Self {
        Self {
            source,
            title: None,
            genres: BTreeSet::new(),
            order_index,
            cue: Cue::default(),
        }
    }

    pub fn local(path: impl Into<PathBuf>, order_index: usize) -> Self {
        Self::new(ItemSource::Local(path.into()), order_index)
    }

    pub fn remote(id: impl Into<String>, order_index: usize) -> Self {
        Self::new(ItemSource::Remote(id.into()), order_index)
    }

    /// Set the title; blank titles are treated as absent.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        let trimmed = title.trim();
        self.title = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Replace the tag set, normalizing to trimmed lowercase.
    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.genres = genres
            .into_iter()
            .map(|g| g.as_ref().trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        self
    }

    /// Parse a `|`-separated tag list.
    pub fn with_genre_field(self, field: &str) -> Self {
        self.with_genres(field.split('|'))
    }

    pub fn with_cue(mut self, cue: Cue) -> Self {
        self.cue = cue;
        self
    }

    /// Human-readable label: title, else file name, else identifier.
    pub fn display_label(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match &self.source {
            ItemSource::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ItemSource::Remote(id) => id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_field_is_normalized() {
        let item = PlaylistItem::remote("abcdefgh123", 0).with_genre_field(" Pop | ROCK||  ");
        let genres: Vec<_> = item.genres.iter().map(String::as_str).collect();
        assert_eq!(genres, vec!["pop", "rock"]);
    }

    #[test]
    fn test_blank_title_is_absent() {
        let item = PlaylistItem::remote("abcdefgh123", 0).with_title("   ");
        assert!(item.title.is_none());
        assert_eq!(item.display_label(), "abcdefgh123");
    }

    #[test]
    fn test_display_label_falls_back_to_file_name() {
        let item = PlaylistItem::local("/media/videos/song.mp4", 2);
        assert_eq!(item.display_label(), "song.mp4");
    }

    #[test]
    fn test_local_and_remote_sources_never_collide() {
        let local = ItemSource::Local(PathBuf::from("abc"));
        let remote = ItemSource::Remote("abc".to_string());
        assert_ne!(local, remote);
    }

    #[test]
    fn test_cue_prefers_chorus_over_start() {
        let cue = Cue {
            start_secs: Some(5.0),
            chorus_secs: Some(42.0),
        };
        assert!((cue.resolve_start(10.0, 0.0) - 32.0).abs() < 1e-9);

        let early_chorus = Cue {
            start_secs: None,
            chorus_secs: Some(4.0),
        };
        assert_eq!(early_chorus.resolve_start(10.0, 0.0), 0.0);

        assert!((Cue::default().resolve_start(10.0, 7.5) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_item_serialization() {
        let item = PlaylistItem::local("/a/b.mp4", 0)
            .with_title("B")
            .with_genres(["pop"]);
        let json = serde_json::to_string(&item).unwrap();
        let parsed: PlaylistItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }
}
