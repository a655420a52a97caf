//! Application configuration.
//!
//! Defaults live here and are threaded explicitly into the selection,
//! render and embed stages. Nothing reads configuration from ambient state
//! after [`AppConfig::load`] returns.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PowerHourError, PowerHourResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Selection defaults.
    pub selection: SelectionDefaults,

    /// Local render defaults.
    pub render: RenderDefaults,

    /// Embedded playlist defaults.
    pub embed: EmbedDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionDefaults {
    /// Maximum number of items (None = no cap).
    pub limit: Option<usize>,

    /// Shuffle candidates before truncating.
    pub shuffle: bool,

    /// Glob patterns used when scanning a directory.
    pub patterns: Vec<String>,

    /// Recognized video container extensions (lowercase, no dot).
    pub extensions: Vec<String>,
}

/// Default render parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Seconds taken from each source.
    pub clip_seconds: f64,

    /// Cross-dissolve length between neighbors (0 = hard cuts).
    pub crossfade_seconds: f64,

    /// Seconds skipped at the start of each source.
    pub start_offset: f64,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Output container/codec.
    pub format: OutputFormat,

    /// Video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Audio fade applied at hard cuts to avoid clicks (0 = off).
    pub audio_fade_seconds: f64,

    /// Join with stream copy when every source already matches the output.
    pub allow_stream_copy: bool,

    /// Number of concurrent ffprobe processes.
    pub probe_parallelism: usize,
}

/// Default embed parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedDefaults {
    /// Seconds of playback per video.
    pub clip_seconds: f64,

    /// Start this many seconds before a chorus cue.
    pub pre_chorus: f64,

    /// Start position when an item carries no cue.
    pub default_start: f64,

    /// Seconds of playback before the title is revealed (0 = immediately).
    pub title_reveal_delay: f64,
}

/// Output container/codec combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(rename = "mp4-h264")]
    Mp4H264,
    #[serde(rename = "mp4-h265")]
    Mp4H265,
    Webm,
}

impl OutputFormat {
    /// Parse the CLI spelling of a format.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp4-h264" | "mp4" | "h264" => Some(Self::Mp4H264),
            "mp4-h265" | "h265" | "hevc" => Some(Self::Mp4H265),
            "webm" | "vp9" => Some(Self::Webm),
            _ => None,
        }
    }

    /// ffprobe codec name produced by this format's video encoder.
    pub fn video_codec_name(&self) -> &'static str {
        match self {
            Self::Mp4H264 => "h264",
            Self::Mp4H265 => "hevc",
            Self::Webm => "vp9",
        }
    }

    /// ffprobe codec name produced by this format's audio encoder.
    pub fn audio_codec_name(&self) -> &'static str {
        match self {
            Self::Mp4H264 | Self::Mp4H265 => "aac",
            Self::Webm => "opus",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "powerhour=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for SelectionDefaults {
    fn default() -> Self {
        Self {
            limit: Some(60),
            shuffle: true,
            patterns: vec!["*.mp4".to_string(), "*.mov".to_string()],
            extensions: ["mp4", "mov", "mkv", "webm", "m4v"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            clip_seconds: 60.0,
            crossfade_seconds: 0.0,
            start_offset: 0.0,
            width: 1280,
            height: 720,
            fps: 30,
            format: OutputFormat::Mp4H264,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            audio_fade_seconds: 0.1,
            allow_stream_copy: true,
            probe_parallelism: 4,
        }
    }
}

impl Default for EmbedDefaults {
    fn default() -> Self {
        Self {
            clip_seconds: 60.0,
            pre_chorus: 10.0,
            default_start: 0.0,
            title_reveal_delay: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(content: &str) -> PowerHourResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> PowerHourResult<()> {
        let render = &self.render;
        if !positive(render.clip_seconds) {
            return Err(PowerHourError::config("render.clip_seconds must be positive"));
        }
        if !non_negative(render.crossfade_seconds) {
            return Err(PowerHourError::config(
                "render.crossfade_seconds must not be negative",
            ));
        }
        if !non_negative(render.start_offset) {
            return Err(PowerHourError::config("render.start_offset must not be negative"));
        }
        if render.width == 0 || render.height == 0 || render.fps == 0 {
            return Err(PowerHourError::config(
                "render width, height and fps must be non-zero",
            ));
        }
        // yuv420p subsamples chroma by two in both directions.
        if render.width % 2 != 0 || render.height % 2 != 0 {
            return Err(PowerHourError::config(format!(
                "render size must be even, got {}x{}",
                render.width, render.height
            )));
        }
        if !positive(self.embed.clip_seconds) {
            return Err(PowerHourError::config("embed.clip_seconds must be positive"));
        }
        if self.selection.limit == Some(0) {
            return Err(PowerHourError::config("selection.limit must be at least 1"));
        }
        if self.selection.extensions.is_empty() {
            return Err(PowerHourError::config(
                "selection.extensions must list at least one extension",
            ));
        }
        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("powerhour").join("config.json")
}
