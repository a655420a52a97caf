//! Power Hour Embed Generator
//!
//! Produces a static HTML document that plays a selection through the
//! external video player, advancing every `clip_seconds` of active
//! playback or when a video ends, whichever comes first.
//!
//! - [`state_machine`]: the timed-advance transition function and the
//!   dry-run schedule built on it
//! - [`document`]: item resolution and document emission
//!
//! The document must be served over HTTP; the external player refuses to
//! run inside `file://` pages.

pub mod document;
pub mod state_machine;

pub use document::{embed_items, generate, render_document, EmbedItem, EmbedOptions};
pub use state_machine::{
    nominal_schedule, step, PlaybackMachine, PlayerEvent, PlayerState, ScheduleEntry,
};
