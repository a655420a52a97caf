//! Shared argument groups and their mapping onto configuration.

use std::path::PathBuf;

use clap::{ArgGroup, Args};

use powerhour_common::config::{AppConfig, OutputFormat};
use powerhour_common::error::PowerHourError;
use powerhour_embed::EmbedOptions;
use powerhour_selection::{Manifest, SelectionOptions};

/// Where candidates come from and how they are selected.
#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["dir", "playlist", "urls", "table"])
))]
pub struct SourceArgs {
    /// Directory scanned recursively for video files
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Text file with one local video path per line
    #[arg(long)]
    pub playlist: Option<PathBuf>,

    /// Text file with one video URL or id per line
    #[arg(long)]
    pub urls: Option<PathBuf>,

    /// CSV with id/url, title, genre, chorus and start columns
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// CSV mapping local paths to genres (path,genre)
    #[arg(long)]
    pub genre_map: Option<PathBuf>,

    /// File name glob used with --dir (repeatable)
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,

    /// Keep only items of this genre
    #[arg(long)]
    pub genre: Option<String>,

    /// Maximum number of clips
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Keep manifest order
    #[arg(long)]
    pub no_shuffle: bool,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds per clip
    #[arg(short, long)]
    pub clip: Option<f64>,
}

impl SourceArgs {
    pub fn manifest(&self, config: &AppConfig) -> anyhow::Result<Manifest> {
        if self.genre_map.is_some() && self.dir.is_none() && self.playlist.is_none() {
            return Err(PowerHourError::input(
                "--genre-map applies to --dir and --playlist sources only",
            )
            .into());
        }
        let manifest = if let Some(root) = &self.dir {
            Manifest::Directory {
                root: root.clone(),
                patterns: if self.patterns.is_empty() {
                    config.selection.patterns.clone()
                } else {
                    self.patterns.clone()
                },
                extensions: config.selection.extensions.clone(),
                genre_map: self.genre_map.clone(),
            }
        } else if let Some(path) = &self.playlist {
            Manifest::PlaylistFile {
                path: path.clone(),
                genre_map: self.genre_map.clone(),
            }
        } else if let Some(path) = &self.urls {
            Manifest::VideoList { path: path.clone() }
        } else if let Some(path) = &self.table {
            Manifest::VideoTable { path: path.clone() }
        } else {
            return Err(PowerHourError::input("no source given").into());
        };
        Ok(manifest)
    }

    pub fn selection_options(&self, config: &AppConfig, clip_seconds: f64) -> SelectionOptions {
        let mut options = SelectionOptions::from_defaults(&config.selection, clip_seconds);
        options.genre = self.genre.clone();
        if self.limit.is_some() {
            options.limit = self.limit;
        }
        if self.no_shuffle {
            options.shuffle = false;
        }
        options.seed = self.seed;
        options
    }
}

/// Overrides for the render section.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Crossfade between clips in seconds (0 = hard cuts)
    #[arg(long)]
    pub crossfade: Option<f64>,

    /// Seconds skipped at the start of every source
    #[arg(long)]
    pub start_offset: Option<f64>,

    /// Output width
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Output format: mp4-h264, mp4-h265, webm
    #[arg(long)]
    pub format: Option<String>,

    /// Audio fade at hard cuts in seconds (0 = off)
    #[arg(long)]
    pub audio_fade: Option<f64>,

    /// Always re-encode, even when stream copy would work
    #[arg(long)]
    pub no_stream_copy: bool,

    /// Concurrent ffprobe processes
    #[arg(long)]
    pub jobs: Option<usize>,
}

impl RenderArgs {
    /// Fold the overrides (and `--clip`) into a validated configuration.
    pub fn apply(&self, config: &AppConfig, clip: Option<f64>) -> anyhow::Result<AppConfig> {
        let mut config = config.clone();
        let render = &mut config.render;
        if let Some(clip) = clip {
            render.clip_seconds = clip;
        }
        if let Some(crossfade) = self.crossfade {
            render.crossfade_seconds = crossfade;
        }
        if let Some(offset) = self.start_offset {
            render.start_offset = offset;
        }
        if let Some(width) = self.width {
            render.width = width;
        }
        if let Some(height) = self.height {
            render.height = height;
        }
        if let Some(fps) = self.fps {
            render.fps = fps;
        }
        if let Some(format) = &self.format {
            render.format = OutputFormat::parse(format).ok_or_else(|| {
                PowerHourError::config(format!(
                    "unknown format: {format}. Use: mp4-h264, mp4-h265, webm"
                ))
            })?;
        }
        if let Some(fade) = self.audio_fade {
            render.audio_fade_seconds = fade;
        }
        if self.no_stream_copy {
            render.allow_stream_copy = false;
        }
        if let Some(jobs) = self.jobs {
            render.probe_parallelism = jobs.max(1);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Overrides for the embed section.
#[derive(Args, Debug, Clone, Default)]
pub struct EmbedArgs {
    /// Seconds played before a chorus cue
    #[arg(long)]
    pub pre_chorus: Option<f64>,

    /// Start position for items without a cue
    #[arg(long)]
    pub default_start: Option<f64>,

    /// Seconds of playback before the title is shown (0 = immediately)
    #[arg(long)]
    pub title_delay: Option<f64>,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,
}

impl EmbedArgs {
    pub fn options(&self, config: &AppConfig, clip: Option<f64>) -> anyhow::Result<EmbedOptions> {
        let mut options = EmbedOptions::from_defaults(&config.embed);
        if let Some(clip) = clip {
            options.clip_seconds = clip;
        }
        if let Some(pre_chorus) = self.pre_chorus {
            options.pre_chorus = pre_chorus;
        }
        if let Some(start) = self.default_start {
            options.default_start = start;
        }
        if let Some(delay) = self.title_delay {
            options.title_reveal_delay = delay;
        }
        if let Some(title) = &self.title {
            options.page_title = title.clone();
        }
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceArgs {
        SourceArgs {
            dir: None,
            playlist: None,
            urls: Some(PathBuf::from("urls.txt")),
            table: None,
            genre_map: None,
            patterns: vec![],
            genre: None,
            limit: None,
            no_shuffle: false,
            seed: None,
            clip: None,
        }
    }

    #[test]
    fn test_render_overrides_are_validated() {
        let config = AppConfig::default();
        let args = RenderArgs {
            crossfade: Some(-1.0),
            ..RenderArgs::default()
        };
        let err = args.apply(&config, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PowerHourError>(),
            Some(PowerHourError::Config { .. })
        ));

        let args = RenderArgs {
            format: Some("webm".to_string()),
            no_stream_copy: true,
            ..RenderArgs::default()
        };
        let applied = args.apply(&config, Some(30.0)).unwrap();
        assert_eq!(applied.render.format, OutputFormat::Webm);
        assert_eq!(applied.render.clip_seconds, 30.0);
        assert!(!applied.render.allow_stream_copy);
    }

    #[test]
    fn test_genre_map_needs_local_source() {
        let args = SourceArgs {
            genre_map: Some(PathBuf::from("genres.csv")),
            ..source()
        };
        assert!(args.manifest(&AppConfig::default()).is_err());
    }

    #[test]
    fn test_selection_flags_override_defaults() {
        let args = SourceArgs {
            limit: Some(5),
            no_shuffle: true,
            seed: Some(7),
            genre: Some("rock".to_string()),
            ..source()
        };
        let options = args.selection_options(&AppConfig::default(), 45.0);
        assert_eq!(options.limit, Some(5));
        assert!(!options.shuffle);
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.clip_seconds, 45.0);
    }
}
