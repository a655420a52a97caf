//! Power Hour Selection Engine
//!
//! Turns a source manifest into an ordered, deduplicated [`SelectionPlan`]:
//! - **Manifests:** directory scans, playlist files, video lists and tables
//! - **Filtering:** genre predicates composed by logical OR
//! - **Ordering:** seeded shuffle, limit, and final renumbering
//!
//! Loading touches the filesystem; everything after loading is pure.
//!
//! [`SelectionPlan`]: powerhour_playlist_model::SelectionPlan

pub mod filter;
pub mod manifest;
pub mod scan;
pub mod select;
pub mod table;

pub use filter::{genre_filter, ItemPredicate};
pub use manifest::{LoadedManifest, Manifest, ManifestEntry};
pub use select::{select, select_entries, SelectionOptions};
