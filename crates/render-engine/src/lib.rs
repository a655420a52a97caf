//! Power Hour Render Engine
//!
//! Turns a selection into one rendered video file with a single ffmpeg
//! invocation.
//!
//! # Pipeline Architecture
//!
//! ```text
//! SelectionPlan ──┐
//!                 ├── Probe durations (parallel, order-preserving)
//! ffprobe ────────┘         │
//!                           ├── Plan trim windows + crossfade overlaps
//!                           │
//!                           ├── Validate overlap invariant
//!                           │
//!                           ├── Build command
//!                           │     ├─ stream copy (concat demuxer)
//!                           │     └─ filter graph (normalize → concat | xfade chain)
//!                           ▼
//!                      ffmpeg → temp file → atomic rename
//!                           │
//!                           ▼
//!                      output.mp4
//! ```

pub mod command;
pub mod export;
pub mod filter_graph;
pub mod planner;
pub mod probe;

pub use command::{choose_join_strategy, FfmpegCommand, JoinStrategy, OutputSettings};
pub use export::*;
pub use planner::{
    crossfade_cap, plan, plan_segments, total_duration, transition_offsets, validate_segments,
    PlanConfig, RenderPlan, RenderSegment,
};
pub use probe::{probe_all, Ffprobe, MediaInfo, MediaProbe};
