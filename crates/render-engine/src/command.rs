//! ffmpeg argument construction.

use std::path::Path;

use powerhour_common::config::{OutputFormat, RenderDefaults};

use crate::filter_graph::{build_filter_graph, AUDIO_OUT, VIDEO_OUT};
use crate::planner::{RenderPlan, RenderSegment};

/// Target output parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: OutputFormat,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,

    /// Fade applied at every hard cut (0 = off).
    pub audio_fade_seconds: f64,

    pub allow_stream_copy: bool,
}

impl OutputSettings {
    pub fn from_defaults(defaults: &RenderDefaults) -> Self {
        Self {
            width: defaults.width,
            height: defaults.height,
            fps: defaults.fps,
            format: defaults.format,
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
            audio_fade_seconds: defaults.audio_fade_seconds,
            allow_stream_copy: defaults.allow_stream_copy,
        }
    }

    /// Container extension for temporary files.
    pub fn extension(&self) -> &'static str {
        match self.format {
            OutputFormat::Mp4H264 | OutputFormat::Mp4H265 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }

    fn muxer(&self) -> &'static str {
        self.extension()
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self::from_defaults(&RenderDefaults::default())
    }
}

/// How segments are joined into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Concat demuxer with `-c copy`; no re-encode.
    StreamCopy,

    /// One `-filter_complex` graph and a single encode.
    FilterGraph,
}

impl JoinStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StreamCopy => "stream-copy",
            Self::FilterGraph => "filter-graph",
        }
    }
}

/// Stream copy is only safe when nothing needs filtering and every source
/// already has the output's exact stream parameters.
pub fn choose_join_strategy(plan: &RenderPlan, settings: &OutputSettings) -> JoinStrategy {
    let eligible = settings.allow_stream_copy
        && settings.audio_fade_seconds <= 0.0
        && !plan.has_crossfades()
        && !plan.segments.is_empty()
        && plan
            .segments
            .iter()
            .all(|segment| segment_matches_output(segment, settings));
    if eligible {
        JoinStrategy::StreamCopy
    } else {
        JoinStrategy::FilterGraph
    }
}

fn segment_matches_output(segment: &RenderSegment, settings: &OutputSettings) -> bool {
    let media = &segment.media;
    media.video_codec.as_deref() == Some(settings.format.video_codec_name())
        && media.width == Some(settings.width)
        && media.height == Some(settings.height)
        && media
            .fps
            .is_some_and(|fps| (fps - settings.fps as f64).abs() < 0.01)
        && media.pix_fmt.as_deref() == Some("yuv420p")
        && media.has_audio
        && media.audio_codec.as_deref() == Some(settings.format.audio_codec_name())
        && media.sample_rate == Some(48_000)
        && media.channels == Some(2)
}

/// An ffmpeg invocation ready to spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    pub strategy: JoinStrategy,
    pub args: Vec<String>,

    /// `ffconcat` document the args refer to, for stream copy.
    pub concat_list: Option<String>,

    /// Expected output length, for progress.
    pub expected_duration_secs: f64,
}

impl FfmpegCommand {
    /// Build the single invocation that renders `plan` into `output`.
    ///
    /// `concat_list_path` is where the caller will write
    /// [`FfmpegCommand::concat_list`] when stream copy is chosen.
    pub fn build(
        plan: &RenderPlan,
        settings: &OutputSettings,
        output: &Path,
        concat_list_path: &Path,
    ) -> Self {
        let strategy = choose_join_strategy(plan, settings);
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-y",
            "-loglevel",
            "error",
            "-progress",
            "pipe:1",
            "-nostats",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let concat_list = match strategy {
            JoinStrategy::StreamCopy => {
                args.extend(
                    ["-f", "concat", "-safe", "0", "-i"]
                        .iter()
                        .map(|s| s.to_string()),
                );
                args.push(concat_list_path.display().to_string());
                args.extend(
                    ["-map", "0:v:0", "-map", "0:a:0", "-c", "copy"]
                        .iter()
                        .map(|s| s.to_string()),
                );
                if settings.muxer() == "mp4" {
                    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
                }
                Some(concat_list(&plan.segments))
            }
            JoinStrategy::FilterGraph => {
                for segment in &plan.segments {
                    args.extend([
                        "-ss".to_string(),
                        format!("{:.3}", segment.trim_start),
                        "-t".to_string(),
                        format!("{:.3}", segment.duration()),
                        "-i".to_string(),
                        segment.path().display().to_string(),
                    ]);
                }
                args.push("-filter_complex".to_string());
                args.push(build_filter_graph(&plan.segments, settings));
                args.extend([
                    "-map".to_string(),
                    format!("[{VIDEO_OUT}]"),
                    "-map".to_string(),
                    format!("[{AUDIO_OUT}]"),
                ]);
                args.extend(codec_args_for_format(settings));
                None
            }
        };

        args.extend(["-f".to_string(), settings.muxer().to_string()]);
        args.push(output.display().to_string());

        Self {
            strategy,
            args,
            concat_list,
            expected_duration_secs: plan.total_duration(),
        }
    }

    /// Shell-ish rendering for dry runs and logs.
    pub fn display_line(&self, binary: &str) -> String {
        std::iter::once(binary.to_string())
            .chain(self.args.iter().map(|arg| quote_arg(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// `ffconcat` list with one windowed entry per segment.
pub fn concat_list(segments: &[RenderSegment]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for segment in segments {
        let path = segment.path().display().to_string();
        list.push_str(&format!("file '{}'\n", path.replace('\'', r"'\''")));
        list.push_str(&format!("inpoint {:.3}\n", segment.trim_start));
        list.push_str(&format!("outpoint {:.3}\n", segment.trim_end));
    }
    list
}

/// Encoder arguments for the output format.
pub fn codec_args_for_format(settings: &OutputSettings) -> Vec<String> {
    let video_bitrate = format!("{}k", settings.video_bitrate_kbps.max(500));
    let audio_bitrate = format!("{}k", settings.audio_bitrate_kbps.max(64));

    let args: &[&str] = match settings.format {
        OutputFormat::Mp4H264 => &[
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-profile:v",
            "high",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            "{vb}",
            "-c:a",
            "aac",
            "-b:a",
            "{ab}",
            "-movflags",
            "+faststart",
        ],
        OutputFormat::Mp4H265 => &[
            "-c:v",
            "libx265",
            "-preset",
            "medium",
            "-tag:v",
            "hvc1",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            "{vb}",
            "-c:a",
            "aac",
            "-b:a",
            "{ab}",
            "-movflags",
            "+faststart",
        ],
        OutputFormat::Webm => &[
            "-c:v",
            "libvpx-vp9",
            "-row-mt",
            "1",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            "{vb}",
            "-c:a",
            "libopus",
            "-b:a",
            "{ab}",
        ],
    };

    let mut out: Vec<String> = args
        .iter()
        .map(|arg| match *arg {
            "{vb}" => video_bitrate.clone(),
            "{ab}" => audio_bitrate.clone(),
            other => other.to_string(),
        })
        .collect();
    out.extend([
        "-r".to_string(),
        settings.fps.to_string(),
        "-ar".to_string(),
        "48000".to_string(),
        "-ac".to_string(),
        "2".to_string(),
    ]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{plan_segments, PlanConfig};
    use crate::probe::MediaInfo;
    use powerhour_playlist_model::PlaylistItem;
    use std::path::PathBuf;

    fn matching_media(duration: f64) -> MediaInfo {
        MediaInfo {
            duration_secs: duration,
            has_audio: true,
            width: Some(1280),
            height: Some(720),
            fps: Some(30.0),
            video_codec: Some("h264".to_string()),
            pix_fmt: Some("yuv420p".to_string()),
            audio_codec: Some("aac".to_string()),
            sample_rate: Some(48_000),
            channels: Some(2),
        }
    }

    fn plan_of(media: Vec<MediaInfo>, crossfade: f64) -> RenderPlan {
        let probed = media
            .into_iter()
            .enumerate()
            .map(|(idx, m)| (PlaylistItem::local(format!("/v/clip {idx}.mp4"), idx), m))
            .collect();
        plan_segments(
            probed,
            &PlanConfig {
                clip_seconds: 60.0,
                crossfade_seconds: crossfade,
                start_offset: 0.0,
                probe_parallelism: 1,
            },
        )
    }

    fn copy_settings() -> OutputSettings {
        OutputSettings {
            audio_fade_seconds: 0.0,
            ..OutputSettings::default()
        }
    }

    #[test]
    fn test_stream_copy_needs_matching_sources() {
        let plan = plan_of(vec![matching_media(90.0), matching_media(90.0)], 0.0);
        assert_eq!(
            choose_join_strategy(&plan, &copy_settings()),
            JoinStrategy::StreamCopy
        );

        let mut odd = matching_media(90.0);
        odd.width = Some(1920);
        let plan = plan_of(vec![matching_media(90.0), odd], 0.0);
        assert_eq!(
            choose_join_strategy(&plan, &copy_settings()),
            JoinStrategy::FilterGraph
        );
    }

    #[test]
    fn test_fades_or_crossfades_force_reencode() {
        let media = vec![matching_media(90.0), matching_media(90.0)];
        let faded = plan_of(media.clone(), 0.0);
        assert_eq!(
            choose_join_strategy(&faded, &OutputSettings::default()),
            JoinStrategy::FilterGraph
        );
        let crossfaded = plan_of(media, 1.0);
        assert_eq!(
            choose_join_strategy(&crossfaded, &copy_settings()),
            JoinStrategy::FilterGraph
        );
    }

    #[test]
    fn test_filter_graph_command_has_one_input_per_segment() {
        let plan = plan_of(vec![MediaInfo {
            duration_secs: 120.0,
            has_audio: true,
            ..MediaInfo::default()
        }; 3], 0.0);
        let cmd = FfmpegCommand::build(
            &plan,
            &OutputSettings::default(),
            Path::new("/out/.tmp-hour.mp4"),
            Path::new("/tmp/list.ffconcat"),
        );
        assert_eq!(cmd.strategy, JoinStrategy::FilterGraph);
        assert_eq!(cmd.args.iter().filter(|a| *a == "-i").count(), 3);
        assert_eq!(cmd.args.iter().filter(|a| *a == "-filter_complex").count(), 1);
        assert!(cmd.args.windows(2).any(|w| w[0] == "-t" && w[1] == "60.000"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("/out/.tmp-hour.mp4"));
        assert!(cmd.concat_list.is_none());
        assert!((cmd.expected_duration_secs - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_stream_copy_command_uses_concat_demuxer() {
        let plan = plan_of(vec![matching_media(90.0), matching_media(45.0)], 0.0);
        let list_path = PathBuf::from("/tmp/list.ffconcat");
        let cmd = FfmpegCommand::build(
            &plan,
            &copy_settings(),
            Path::new("/out/hour.mp4"),
            &list_path,
        );
        assert_eq!(cmd.strategy, JoinStrategy::StreamCopy);
        assert!(cmd.args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert!(cmd.args.contains(&"/tmp/list.ffconcat".to_string()));
        let list = cmd.concat_list.unwrap();
        assert!(list.starts_with("ffconcat version 1.0\n"));
        assert!(list.contains("file '/v/clip 1.mp4'\ninpoint 0.000\noutpoint 45.000\n"));
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let plan = plan_segments(
            vec![(
                PlaylistItem::local("/v/don't stop.mp4", 0),
                matching_media(90.0),
            )],
            &PlanConfig {
                clip_seconds: 30.0,
                crossfade_seconds: 0.0,
                start_offset: 5.0,
                probe_parallelism: 1,
            },
        );
        let list = concat_list(&plan.segments);
        assert!(list.contains(r"file '/v/don'\''t stop.mp4'"));
        assert!(list.contains("inpoint 5.000\noutpoint 35.000"));
    }

    #[test]
    fn test_codec_args_per_format() {
        let mut settings = OutputSettings::default();
        let h264 = codec_args_for_format(&settings);
        assert!(h264.contains(&"libx264".to_string()));
        assert!(h264.contains(&"8000k".to_string()));

        settings.format = OutputFormat::Webm;
        let webm = codec_args_for_format(&settings);
        assert!(webm.contains(&"libvpx-vp9".to_string()));
        assert!(webm.contains(&"libopus".to_string()));
        assert!(!webm.contains(&"+faststart".to_string()));
    }

    #[test]
    fn test_display_line_quotes_unsafe_args() {
        let cmd = FfmpegCommand {
            strategy: JoinStrategy::FilterGraph,
            args: vec!["-i".to_string(), "/v/my clip.mp4".to_string()],
            concat_list: None,
            expected_duration_secs: 0.0,
        };
        assert_eq!(cmd.display_line("ffmpeg"), "ffmpeg -i '/v/my clip.mp4'");
    }
}
