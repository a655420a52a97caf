//! `-filter_complex` construction.
//!
//! ```text
//! [0:v] ─ scale/pad/fps/format ─ [v0] ─┐
//! [0:a] ─ resample/trim ──────── [a0] ─┤
//!                                      ├─ concat ─────────────┐
//! [1:v] ─ scale/pad/fps/format ─ [v1] ─┤   or                 ├─ [vout]
//! [1:a] ─ resample/trim ──────── [a1] ─┘   xfade+acrossfade ──┴─ [aout]
//! ```
//!
//! Input `i` is segment `i`, already windowed with `-ss`/`-t`. Every
//! segment is normalized to one resolution, frame rate, pixel format and
//! audio layout before any join, so the join filters never see mismatched
//! streams.

use crate::command::OutputSettings;
use crate::planner::{transition_offsets, RenderSegment};

pub const VIDEO_OUT: &str = "vout";
pub const AUDIO_OUT: &str = "aout";

const SAMPLE_RATE: u32 = 48_000;

/// Build the complete graph for `segments`.
pub fn build_filter_graph(segments: &[RenderSegment], settings: &OutputSettings) -> String {
    let mut chains: Vec<String> = Vec::with_capacity(segments.len() * 2 + 1);

    for (idx, segment) in segments.iter().enumerate() {
        chains.push(video_chain(idx, segment, settings));
        chains.push(audio_chain(idx, segment, settings.audio_fade_seconds));
    }

    match segments.len() {
        0 => {}
        1 => chains.push(format!("[v0]null[{VIDEO_OUT}];[a0]anull[{AUDIO_OUT}]")),
        n if segments.iter().all(|s| s.overlap_out <= 0.0) => {
            let inputs: String = (0..n).map(|i| format!("[v{i}][a{i}]")).collect();
            chains.push(format!(
                "{inputs}concat=n={n}:v=1:a=1[{VIDEO_OUT}][{AUDIO_OUT}]"
            ));
        }
        _ => chains.extend(transition_chain(segments)),
    }

    chains.join(";")
}

/// The video track may end before the container does, so the last frame is
/// held and the stream cut to the same window as the audio.
fn video_chain(idx: usize, segment: &RenderSegment, settings: &OutputSettings) -> String {
    let (w, h, fps) = (settings.width, settings.height, settings.fps);
    let duration = segment.duration();
    format!(
        "[{idx}:v:0]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p,\
         tpad=stop_mode=clone:stop_duration={duration:.3},trim=duration={duration:.3},\
         settb=AVTB,setpts=PTS-STARTPTS[v{idx}]"
    )
}

fn audio_chain(idx: usize, segment: &RenderSegment, fade: f64) -> String {
    let duration = segment.duration();
    let source = if segment.media.has_audio {
        format!(
            "[{idx}:a:0]aresample={SAMPLE_RATE},\
             aformat=sample_fmts=fltp:channel_layouts=stereo,apad"
        )
    } else {
        format!("anullsrc=r={SAMPLE_RATE}:cl=stereo,aformat=sample_fmts=fltp")
    };

    let mut chain = format!("{source},atrim=duration={duration:.3},asetpts=PTS-STARTPTS");
    if fade > 0.0 && duration > fade * 2.0 {
        if segment.overlap_in <= 0.0 {
            chain.push_str(&format!(",afade=t=in:st=0:d={fade:.3}"));
        }
        if segment.overlap_out <= 0.0 {
            let start = duration - fade;
            chain.push_str(&format!(",afade=t=out:st={start:.3}:d={fade:.3}"));
        }
    }
    chain.push_str(&format!("[a{idx}]"));
    chain
}

/// Chain N segments through N-1 joins. Boundaries with an overlap get
/// `xfade`/`acrossfade`; clamped-to-zero boundaries get a two-input concat.
fn transition_chain(segments: &[RenderSegment]) -> Vec<String> {
    let offsets = transition_offsets(segments);
    let last = segments.len() - 1;
    let mut chains = Vec::with_capacity(last * 2);
    let mut video = "v0".to_string();
    let mut audio = "a0".to_string();

    for boundary in 0..last {
        let next = boundary + 1;
        let (video_out, audio_out) = if next == last {
            (VIDEO_OUT.to_string(), AUDIO_OUT.to_string())
        } else {
            (format!("vx{boundary}"), format!("ax{boundary}"))
        };
        let overlap = segments[boundary].overlap_out;

        if overlap > 0.0 {
            let offset = offsets[boundary];
            chains.push(format!(
                "[{video}][v{next}]xfade=transition=fade:duration={overlap:.3}:offset={offset:.3}[{video_out}]"
            ));
            chains.push(format!(
                "[{audio}][a{next}]acrossfade=d={overlap:.3}:c1=tri:c2=tri[{audio_out}]"
            ));
        } else {
            chains.push(format!(
                "[{video}][{audio}][v{next}][a{next}]concat=n=2:v=1:a=1[{video_out}][{audio_out}]"
            ));
        }

        video = video_out;
        audio = audio_out;
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{plan_segments, PlanConfig};
    use crate::probe::MediaInfo;
    use powerhour_playlist_model::PlaylistItem;

    fn settings(fade: f64) -> OutputSettings {
        OutputSettings {
            audio_fade_seconds: fade,
            ..OutputSettings::default()
        }
    }

    fn segments(durations: &[f64], clip: f64, crossfade: f64) -> Vec<RenderSegment> {
        let probed = durations
            .iter()
            .enumerate()
            .map(|(idx, d)| {
                (
                    PlaylistItem::local(format!("/v/{idx}.mp4"), idx),
                    MediaInfo {
                        duration_secs: *d,
                        has_audio: idx != 1,
                        ..MediaInfo::default()
                    },
                )
            })
            .collect();
        let config = PlanConfig {
            clip_seconds: clip,
            crossfade_seconds: crossfade,
            start_offset: 0.0,
            probe_parallelism: 1,
        };
        plan_segments(probed, &config).segments
    }

    #[test]
    fn test_every_input_is_normalized() {
        let graph = build_filter_graph(&segments(&[90.0, 90.0], 60.0, 0.0), &settings(0.0));
        assert!(graph.contains(
            "[0:v:0]scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1,fps=30,format=yuv420p"
        ));
        assert!(graph.contains("[1:v:0]scale=1280:720"));
        assert!(graph.ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[vout][aout]"));
    }

    #[test]
    fn test_video_is_held_and_cut_to_the_audio_window() {
        let graph = build_filter_graph(&segments(&[90.0, 30.0], 60.0, 2.0), &settings(0.0));
        assert!(graph.contains(
            "format=yuv420p,tpad=stop_mode=clone:stop_duration=60.000,trim=duration=60.000,settb=AVTB,setpts=PTS-STARTPTS[v0]"
        ));
        assert!(graph.contains(
            "tpad=stop_mode=clone:stop_duration=30.000,trim=duration=30.000,settb=AVTB,setpts=PTS-STARTPTS[v1]"
        ));
        assert!(graph.contains("atrim=duration=30.000"));
    }

    #[test]
    fn test_silent_source_gets_generated_audio() {
        let graph = build_filter_graph(&segments(&[90.0, 45.0], 60.0, 0.0), &settings(0.0));
        assert!(graph.contains(
            "anullsrc=r=48000:cl=stereo,aformat=sample_fmts=fltp,atrim=duration=45.000,asetpts=PTS-STARTPTS[a1]"
        ));
        assert!(!graph.contains("[1:a:0]"));
    }

    #[test]
    fn test_hard_cuts_get_audio_fades() {
        let graph = build_filter_graph(&segments(&[90.0], 60.0, 0.0), &settings(0.1));
        assert!(graph.contains("afade=t=in:st=0:d=0.100,afade=t=out:st=59.900:d=0.100[a0]"));
        assert!(graph.ends_with("[v0]null[vout];[a0]anull[aout]"));
    }

    #[test]
    fn test_crossfades_chain_with_cumulative_offsets() {
        let graph = build_filter_graph(&segments(&[90.0, 90.0, 90.0], 60.0, 2.0), &settings(0.1));
        assert!(graph.contains(
            "[v0][v1]xfade=transition=fade:duration=2.000:offset=58.000[vx0]"
        ));
        assert!(graph.contains("[a0][a1]acrossfade=d=2.000:c1=tri:c2=tri[ax0]"));
        assert!(graph.contains(
            "[vx0][v2]xfade=transition=fade:duration=2.000:offset=116.000[vout]"
        ));
        assert!(graph.contains("[ax0][a2]acrossfade=d=2.000:c1=tri:c2=tri[aout]"));
        // Only the outer edges fade; crossfaded edges do not.
        assert_eq!(graph.matches("afade=t=in").count(), 1);
        assert_eq!(graph.matches("afade=t=out").count(), 1);
    }

    #[test]
    fn test_clamped_boundary_falls_back_to_concat() {
        let graph = build_filter_graph(
            &segments(&[60.0, 60.0, 0.001], 60.0, 1.0),
            &settings(0.0),
        );
        assert!(graph.contains(
            "[v0][v1]xfade=transition=fade:duration=1.000:offset=59.000[vx0]"
        ));
        assert!(graph.contains("[vx0][ax0][v2][a2]concat=n=2:v=1:a=1[vout][aout]"));
    }
}
