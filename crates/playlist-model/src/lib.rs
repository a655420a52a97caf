//! Power Hour Playlist Model
//!
//! Defines the data contracts shared by every Power Hour pipeline:
//! - **Items:** A playable source (local file or external video id) with
//!   display metadata and an order position
//! - **Plans:** The ordered, deduplicated output of the selection engine
//! - **Warnings:** Per-item problems collected alongside a successful result
//!
//! Identifier and timecode parsing live here so manifests and generators
//! agree on one normalization.

pub mod item;
pub mod plan;
pub mod timecode;
pub mod video_id;
pub mod warning;

pub use item::*;
pub use plan::*;
pub use timecode::parse_timecode;
pub use video_id::extract_video_id;
pub use warning::*;
