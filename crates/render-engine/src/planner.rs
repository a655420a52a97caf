//! Segment planning: trim windows and crossfade overlaps.
//!
//! Planning is pure once durations are known. [`plan`] probes the sources
//! and hands the results to [`plan_segments`]; everything downstream
//! (filter graph, concat list, dry-run output) reads the [`RenderPlan`].

use std::path::PathBuf;

use serde::Serialize;

use powerhour_common::config::RenderDefaults;
use powerhour_common::error::{PowerHourError, PowerHourResult};
use powerhour_playlist_model::{PlaylistItem, SelectionPlan, Warning, WarningKind};

use crate::probe::{probe_all, MediaInfo, MediaProbe};

/// Margin kept between an overlap cap and half a segment.
pub const CROSSFADE_EPSILON: f64 = 0.001;

/// A start offset never lands closer than this to the end of a source.
pub const END_GUARD_SECS: f64 = 0.01;

/// Timing parameters for planning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    pub clip_seconds: f64,

    /// 0 disables crossfades.
    pub crossfade_seconds: f64,

    /// Applied to items without their own start cue.
    pub start_offset: f64,

    pub probe_parallelism: usize,
}

impl PlanConfig {
    pub fn from_defaults(defaults: &RenderDefaults) -> Self {
        Self {
            clip_seconds: defaults.clip_seconds,
            crossfade_seconds: defaults.crossfade_seconds,
            start_offset: defaults.start_offset,
            probe_parallelism: defaults.probe_parallelism,
        }
    }

    pub fn validate(&self) -> PowerHourResult<()> {
        if !(self.clip_seconds.is_finite() && self.clip_seconds > 0.0) {
            return Err(PowerHourError::config("clip length must be positive"));
        }
        if !(self.crossfade_seconds.is_finite() && self.crossfade_seconds >= 0.0) {
            return Err(PowerHourError::config("crossfade must not be negative"));
        }
        if !(self.start_offset.is_finite() && self.start_offset >= 0.0) {
            return Err(PowerHourError::config("start offset must not be negative"));
        }
        Ok(())
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self::from_defaults(&RenderDefaults::default())
    }
}

/// One source window in the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSegment {
    pub item: PlaylistItem,
    pub media: MediaInfo,

    /// Offsets within the source, in seconds.
    pub trim_start: f64,
    pub trim_end: f64,

    /// Crossfade shared with the previous segment.
    pub overlap_in: f64,

    /// Crossfade shared with the next segment.
    pub overlap_out: f64,

    /// The source ran out before a full clip.
    pub short_source: bool,
}

impl RenderSegment {
    pub fn duration(&self) -> f64 {
        self.trim_end - self.trim_start
    }

    /// Local path of the source. Planning only admits local items.
    pub fn path(&self) -> PathBuf {
        self.item
            .source
            .local_path()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }
}

/// Planned segments plus everything that went wrong along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub segments: Vec<RenderSegment>,
    pub warnings: Vec<Warning>,
    pub clip_seconds: f64,
    pub crossfade_seconds: f64,
}

impl RenderPlan {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Output length: segment durations minus shared overlaps.
    pub fn total_duration(&self) -> f64 {
        total_duration(&self.segments)
    }

    pub fn has_crossfades(&self) -> bool {
        self.segments.iter().any(|s| s.overlap_out > 0.0)
    }
}

pub fn total_duration(segments: &[RenderSegment]) -> f64 {
    let body: f64 = segments.iter().map(RenderSegment::duration).sum();
    let overlaps: f64 = segments.iter().map(|s| s.overlap_out).sum();
    body - overlaps
}

/// Largest overlap two neighbors can share without either being consumed.
///
/// Half the shorter neighbor minus [`CROSSFADE_EPSILON`], floored to the
/// millisecond. Non-positive caps mean the boundary must be a hard cut.
pub fn crossfade_cap(left_duration: f64, right_duration: f64) -> f64 {
    let half_ms = (left_duration.min(right_duration) * 500.0 + 1e-9).floor();
    ((half_ms - CROSSFADE_EPSILON * 1000.0) / 1000.0).max(0.0)
}

/// Probe the selection and plan its segments.
///
/// Items that are not local files or fail to probe are dropped with a
/// warning. Fails if nothing usable remains or the result violates the
/// overlap invariant.
pub fn plan(
    selection: &SelectionPlan,
    config: &PlanConfig,
    probe: &dyn MediaProbe,
) -> PowerHourResult<RenderPlan> {
    config.validate()?;
    let items = selection.require_items()?;

    let mut warnings = Vec::new();
    let mut local = Vec::with_capacity(items.len());
    for item in items {
        match item.source.local_path() {
            Some(path) => local.push((item, path.to_path_buf())),
            None => warnings.push(Warning::new(
                WarningKind::ProbeFailed {
                    index: item.order_index,
                },
                format!("{} is not a local file", item.source),
            )),
        }
    }

    let paths: Vec<PathBuf> = local.iter().map(|(_, path)| path.clone()).collect();
    let started = std::time::Instant::now();
    let results = probe_all(probe, &paths, config.probe_parallelism);
    tracing::info!(
        sources = paths.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "Probed sources"
    );

    let mut probed = Vec::with_capacity(local.len());
    for ((item, _), result) in local.into_iter().zip(results) {
        match result {
            Ok(media) => probed.push((item.clone(), media)),
            Err(err) => {
                tracing::warn!(index = item.order_index, error = %err, "Dropping unprobeable source");
                warnings.push(Warning::new(
                    WarningKind::ProbeFailed {
                        index: item.order_index,
                    },
                    err.to_string(),
                ));
            }
        }
    }

    if probed.is_empty() {
        return Err(PowerHourError::input(format!(
            "No usable segments: all {} selected item(s) were rejected",
            items.len()
        )));
    }

    let mut render_plan = plan_segments(probed, config);
    warnings.append(&mut render_plan.warnings);
    render_plan.warnings = warnings;
    validate_segments(&render_plan.segments)?;
    Ok(render_plan)
}

/// Compute trim windows and overlaps for probed items, in order.
pub fn plan_segments(probed: Vec<(PlaylistItem, MediaInfo)>, config: &PlanConfig) -> RenderPlan {
    let mut warnings = Vec::new();
    let clip = config.clip_seconds;

    let mut segments: Vec<RenderSegment> = probed
        .into_iter()
        .map(|(item, media)| {
            let duration = media.duration_secs;
            let wanted_start = item.cue.start_secs.unwrap_or(config.start_offset);
            let trim_start = wanted_start.min(duration - END_GUARD_SECS).max(0.0);
            let trim_end = (trim_start + clip).min(duration);
            let short_source = trim_end - trim_start < clip - 1e-9;
            if short_source {
                warnings.push(Warning::new(
                    WarningKind::ShortSource {
                        index: item.order_index,
                    },
                    format!(
                        "shorter than requested clip length ({:.2}s of {:.2}s available)",
                        trim_end - trim_start,
                        clip
                    ),
                ));
            }
            RenderSegment {
                item,
                media,
                trim_start,
                trim_end,
                overlap_in: 0.0,
                overlap_out: 0.0,
                short_source,
            }
        })
        .collect();

    let requested = config.crossfade_seconds;
    if requested > 0.0 {
        for boundary in 0..segments.len().saturating_sub(1) {
            let cap = crossfade_cap(
                segments[boundary].duration(),
                segments[boundary + 1].duration(),
            );
            let overlap = if requested > cap {
                let message = if cap > 0.0 {
                    format!("crossfade shortened from {requested:.3}s to {cap:.3}s")
                } else {
                    format!("crossfade of {requested:.3}s replaced by a hard cut")
                };
                warnings.push(Warning::new(
                    WarningKind::CrossfadeShortened { boundary },
                    message,
                ));
                cap
            } else {
                requested
            };
            segments[boundary].overlap_out = overlap;
            segments[boundary + 1].overlap_in = overlap;
        }
    }

    let render_plan = RenderPlan {
        segments,
        warnings,
        clip_seconds: clip,
        crossfade_seconds: requested,
    };
    tracing::debug!(
        segments = render_plan.len(),
        total_secs = render_plan.total_duration(),
        warnings = render_plan.warnings.len(),
        "Planned segments"
    );
    render_plan
}

/// Check the overlap invariant on every segment.
pub fn validate_segments(segments: &[RenderSegment]) -> PowerHourResult<()> {
    let last = segments.len().saturating_sub(1);
    for (index, segment) in segments.iter().enumerate() {
        let duration = segment.duration();
        if !(duration.is_finite() && duration > 0.0) {
            return Err(PowerHourError::validation(
                index,
                format!("segment has no usable length ({duration:.3}s)"),
            ));
        }
        if segment.overlap_in < 0.0 || segment.overlap_out < 0.0 {
            return Err(PowerHourError::validation(index, "negative crossfade"));
        }
        if (index == 0 && segment.overlap_in > 0.0) || (index == last && segment.overlap_out > 0.0)
        {
            return Err(PowerHourError::validation(
                index,
                "crossfade at the edge of the playlist",
            ));
        }
        if index < last && (segment.overlap_out - segments[index + 1].overlap_in).abs() > 1e-9 {
            return Err(PowerHourError::validation(
                index,
                "neighbors disagree on their shared crossfade",
            ));
        }
        if segment.overlap_in + segment.overlap_out >= duration {
            return Err(PowerHourError::validation(
                index,
                format!(
                    "crossfades ({:.3}s + {:.3}s) consume the whole {:.3}s segment",
                    segment.overlap_in, segment.overlap_out, duration
                ),
            ));
        }
    }
    Ok(())
}

/// Output time at which each crossfade into segment `boundary + 1` starts.
pub fn transition_offsets(segments: &[RenderSegment]) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(segments.len().saturating_sub(1));
    let Some(first) = segments.first() else {
        return offsets;
    };
    let mut elapsed = first.duration();
    for pair in segments.windows(2) {
        let overlap = pair[0].overlap_out;
        offsets.push(elapsed - overlap);
        elapsed += pair[1].duration() - overlap;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probed(durations: &[f64]) -> Vec<(PlaylistItem, MediaInfo)> {
        durations
            .iter()
            .enumerate()
            .map(|(idx, d)| {
                (
                    PlaylistItem::local(format!("/videos/{idx}.mp4"), idx),
                    MediaInfo {
                        duration_secs: *d,
                        has_audio: true,
                        ..MediaInfo::default()
                    },
                )
            })
            .collect()
    }

    fn config(clip: f64, crossfade: f64) -> PlanConfig {
        PlanConfig {
            clip_seconds: clip,
            crossfade_seconds: crossfade,
            start_offset: 0.0,
            probe_parallelism: 1,
        }
    }

    #[test]
    fn test_three_full_sources_without_crossfade() {
        let plan = plan_segments(probed(&[200.0, 75.0, 60.0]), &config(60.0, 0.0));
        assert_eq!(plan.len(), 3);
        assert!(plan.warnings.is_empty());
        assert!((plan.total_duration() - 180.0).abs() < 1e-9);
        validate_segments(&plan.segments).unwrap();
    }

    #[test]
    fn test_short_source_is_used_in_full_and_flagged() {
        let plan = plan_segments(probed(&[30.0]), &config(60.0, 0.0));
        let seg = &plan.segments[0];
        assert_eq!((seg.trim_start, seg.trim_end), (0.0, 30.0));
        assert!(seg.short_source);
        assert_eq!(plan.warnings[0].kind, WarningKind::ShortSource { index: 0 });
        assert!(plan.warnings[0].message.contains("shorter than requested clip length"));
    }

    #[test]
    fn test_crossfade_duration_formula() {
        let plan = plan_segments(probed(&[120.0; 4]), &config(60.0, 2.0));
        assert!(plan.warnings.is_empty());
        assert!((plan.total_duration() - (4.0 * 60.0 - 3.0 * 2.0)).abs() < 1e-9);
        assert_eq!(plan.segments[0].overlap_in, 0.0);
        assert_eq!(plan.segments[3].overlap_out, 0.0);
        assert_eq!(transition_offsets(&plan.segments), vec![58.0, 116.0, 174.0]);
    }

    #[test]
    fn test_crossfade_is_clamped_against_shorter_neighbor() {
        let plan = plan_segments(probed(&[60.0, 3.0, 60.0]), &config(60.0, 5.0));
        assert_eq!(plan.segments[0].overlap_out, 1.499);
        assert_eq!(plan.segments[1].overlap_in, 1.499);
        assert_eq!(plan.segments[1].overlap_out, 1.499);
        let kinds: Vec<_> = plan.warnings.iter().map(|w| w.kind.clone()).collect();
        assert!(kinds.contains(&WarningKind::CrossfadeShortened { boundary: 0 }));
        assert!(kinds.contains(&WarningKind::CrossfadeShortened { boundary: 1 }));
        validate_segments(&plan.segments).unwrap();
    }

    #[test]
    fn test_tiny_segment_becomes_hard_cut() {
        let plan = plan_segments(probed(&[60.0, 0.001, 60.0]), &config(60.0, 1.0));
        assert_eq!(plan.segments[1].overlap_in, 0.0);
        assert_eq!(plan.segments[1].overlap_out, 0.0);
        assert!(plan.warnings[1].message.contains("hard cut"));
    }

    #[test]
    fn test_crossfade_cap_vectors() {
        assert_eq!(crossfade_cap(60.0, 60.0), 29.999);
        assert_eq!(crossfade_cap(10.0, 4.0), 1.999);
        assert_eq!(crossfade_cap(0.002, 60.0), 0.0);
        assert_eq!(crossfade_cap(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_start_cue_and_offset() {
        let mut items = probed(&[100.0, 100.0, 60.0]);
        items[1].0.cue.start_secs = Some(90.0);
        let mut cfg = config(30.0, 0.0);
        cfg.start_offset = 20.0;
        let plan = plan_segments(items, &cfg);
        assert_eq!(plan.segments[0].trim_start, 20.0);
        assert_eq!(plan.segments[1].trim_start, 90.0);
        assert_eq!(plan.segments[1].trim_end, 100.0);
        assert!(plan.segments[1].short_source);
        assert_eq!(plan.segments[2].trim_end, 50.0);
        assert!(!plan.segments[2].short_source);
    }

    #[test]
    fn test_start_offset_past_end_is_clamped() {
        let mut cfg = config(30.0, 0.0);
        cfg.start_offset = 500.0;
        let plan = plan_segments(probed(&[10.0]), &cfg);
        let seg = &plan.segments[0];
        assert!((seg.trim_start - 9.99).abs() < 1e-9);
        assert_eq!(seg.trim_end, 10.0);
    }

    #[test]
    fn test_validation_reports_offending_index() {
        let mut plan = plan_segments(probed(&[60.0, 60.0, 60.0]), &config(60.0, 0.0));
        plan.segments[1].overlap_in = 30.0;
        plan.segments[0].overlap_out = 30.0;
        plan.segments[1].overlap_out = 30.0;
        plan.segments[2].overlap_in = 30.0;
        let err = validate_segments(&plan.segments).unwrap_err();
        assert!(matches!(err, PowerHourError::Validation { index: 1, .. }));
    }

    proptest::proptest! {
        #[test]
        fn prop_overlaps_never_consume_a_segment(
            durations in proptest::collection::vec(0.05f64..400.0, 1..12),
            clip in 1.0f64..120.0,
            crossfade in 0.0f64..30.0,
        ) {
            let plan = plan_segments(probed(&durations), &config(clip, crossfade));
            for seg in &plan.segments {
                proptest::prop_assert!(seg.overlap_in + seg.overlap_out < seg.duration());
            }
            proptest::prop_assert!(validate_segments(&plan.segments).is_ok());

            let body: f64 = plan.segments.iter().map(|s| s.duration()).sum();
            let overlaps: f64 = plan.segments.iter().map(|s| s.overlap_out).sum();
            proptest::prop_assert!((plan.total_duration() - (body - overlaps)).abs() < 1e-9);
        }
    }
}
