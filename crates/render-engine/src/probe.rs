//! Source metadata probing.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use powerhour_common::error::{PowerHourError, PowerHourResult};

/// What the render pipeline needs to know about a source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub has_audio: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub video_codec: Option<String>,
    pub pix_fmt: Option<String>,
    pub audio_codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

impl MediaInfo {
    /// Parse `ffprobe -of json` output.
    pub fn from_ffprobe_json(path: &Path, json: &str) -> PowerHourResult<Self> {
        let parsed: FfprobeOutput = serde_json::from_str(json)
            .map_err(|e| PowerHourError::probe(path, format!("unreadable ffprobe output: {e}")))?;

        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));
        let audio = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));
        if video.is_none() {
            return Err(PowerHourError::probe(path, "no video stream"));
        }

        let format_duration = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(parse_seconds);
        let duration_secs = format_duration
            .or_else(|| {
                parsed
                    .streams
                    .iter()
                    .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
                    .reduce(f64::max)
            })
            .ok_or_else(|| PowerHourError::probe(path, "no usable duration"))?;

        Ok(Self {
            duration_secs,
            has_audio: audio.is_some(),
            width: video.and_then(|v| v.width).filter(|w| *w > 0),
            height: video.and_then(|v| v.height).filter(|h| *h > 0),
            fps: video.and_then(|v| {
                v.avg_frame_rate
                    .as_deref()
                    .and_then(parse_rate)
                    .or_else(|| v.r_frame_rate.as_deref().and_then(parse_rate))
            }),
            video_codec: video.and_then(|v| v.codec_name.clone()),
            pix_fmt: video.and_then(|v| v.pix_fmt.clone()),
            audio_codec: audio.and_then(|a| a.codec_name.clone()),
            sample_rate: audio
                .and_then(|a| a.sample_rate.as_deref())
                .and_then(|r| r.parse().ok()),
            channels: audio.and_then(|a| a.channels),
        })
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// `30000/1001` or `25` as frames per second.
fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Reads source metadata.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> PowerHourResult<MediaInfo>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: String,
}

impl Ffprobe {
    pub fn new() -> Self {
        Self::with_binary("ffprobe")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaProbe for Ffprobe {
    fn probe(&self, path: &Path) -> PowerHourResult<MediaInfo> {
        if !path.is_file() {
            return Err(PowerHourError::probe(path, "file does not exist"));
        }

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=codec_type,codec_name,width,height,pix_fmt,r_frame_rate,avg_frame_rate,sample_rate,channels,duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| PowerHourError::probe(path, format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(PowerHourError::probe(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        MediaInfo::from_ffprobe_json(path, &stdout)
    }
}

/// Probe every path, at most `parallelism` at a time.
///
/// Results come back in input order regardless of completion order.
pub fn probe_all(
    probe: &dyn MediaProbe,
    paths: &[PathBuf],
    parallelism: usize,
) -> Vec<PowerHourResult<MediaInfo>> {
    let workers = parallelism.clamp(1, paths.len().max(1));
    if workers == 1 {
        return paths.iter().map(|p| probe.probe(p)).collect();
    }

    let mut slots: Vec<Option<PowerHourResult<MediaInfo>>> =
        std::iter::repeat_with(|| None).take(paths.len()).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    paths
                        .iter()
                        .enumerate()
                        .skip(worker)
                        .step_by(workers)
                        .map(|(idx, path)| (idx, probe.probe(path)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(results) => {
                    for (idx, result) in results {
                        slots[idx] = Some(result);
                    }
                }
                Err(_) => tracing::error!("Probe worker panicked"),
            }
        }
    });

    slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| Err(PowerHourError::probe(path, "probe worker panicked")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"{
        "programs": [],
        "streams": [
            {"codec_name": "h264", "codec_type": "video", "width": 1280, "height": 720,
             "pix_fmt": "yuv420p", "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001"},
            {"codec_name": "aac", "codec_type": "audio", "sample_rate": "48000", "channels": 2}
        ],
        "format": {"duration": "212.480000"}
    }"#;

    #[test]
    fn test_parses_ffprobe_json() {
        let info = MediaInfo::from_ffprobe_json(Path::new("a.mp4"), SAMPLE).unwrap();
        assert!((info.duration_secs - 212.48).abs() < 1e-9);
        assert!(info.has_audio);
        assert_eq!(info.width, Some(1280));
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
        assert_eq!(info.sample_rate, Some(48000));
        assert!((info.fps.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_stream_duration_fallback_and_missing_audio() {
        let json = r#"{"streams": [{"codec_type": "video", "duration": "12.5", "r_frame_rate": "0/0"}]}"#;
        let info = MediaInfo::from_ffprobe_json(Path::new("a.webm"), json).unwrap();
        assert_eq!(info.duration_secs, 12.5);
        assert!(!info.has_audio);
        assert_eq!(info.fps, None);
    }

    #[test]
    fn test_rejects_sources_without_video_or_duration() {
        let audio_only = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "10"}}"#;
        assert!(MediaInfo::from_ffprobe_json(Path::new("a.m4a"), audio_only).is_err());

        let no_duration = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "N/A"}}"#;
        let err = MediaInfo::from_ffprobe_json(Path::new("a.mp4"), no_duration).unwrap_err();
        assert!(matches!(err, PowerHourError::Probe { .. }));
    }

    struct TableProbe(HashMap<PathBuf, f64>);

    impl MediaProbe for TableProbe {
        fn probe(&self, path: &Path) -> PowerHourResult<MediaInfo> {
            self.0
                .get(path)
                .map(|d| MediaInfo {
                    duration_secs: *d,
                    ..MediaInfo::default()
                })
                .ok_or_else(|| PowerHourError::probe(path, "unknown"))
        }
    }

    #[test]
    fn test_probe_all_preserves_order() {
        let paths: Vec<PathBuf> = (0..9).map(|i| PathBuf::from(format!("/v/{i}.mp4"))).collect();
        let probe = TableProbe(
            paths
                .iter()
                .enumerate()
                .filter(|(i, _)| i % 4 != 3)
                .map(|(i, p)| (p.clone(), i as f64 + 1.0))
                .collect(),
        );

        let results = probe_all(&probe, &paths, 3);
        assert_eq!(results.len(), 9);
        for (idx, result) in results.iter().enumerate() {
            match result {
                Ok(info) => assert_eq!(info.duration_secs, idx as f64 + 1.0),
                Err(_) => assert_eq!(idx % 4, 3),
            }
        }
    }

    #[test]
    fn test_missing_file_is_probe_error() {
        let err = Ffprobe::new()
            .probe(Path::new("/definitely/missing.mp4"))
            .unwrap_err();
        assert!(matches!(err, PowerHourError::Probe { .. }));
    }
}
