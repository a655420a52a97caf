//! Selection: dedupe, filter, shuffle and limit.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use powerhour_common::config::{AppConfig, SelectionDefaults};
use powerhour_common::error::PowerHourResult;
use powerhour_playlist_model::{ItemSource, SelectionPlan, Warning, WarningKind};

use crate::filter::{genre_filter, ItemPredicate};
use crate::manifest::{LoadedManifest, Manifest};

/// User-facing selection knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOptions {
    /// Genre request; blank or `None` disables filtering.
    pub genre: Option<String>,

    /// Maximum number of items; `None` keeps everything.
    pub limit: Option<usize>,

    pub shuffle: bool,

    /// Shuffle seed. Without one, shuffling is not reproducible.
    pub seed: Option<u64>,

    /// Uniform clip length carried into the plan.
    pub clip_seconds: f64,
}

impl SelectionOptions {
    pub fn from_defaults(defaults: &SelectionDefaults, clip_seconds: f64) -> Self {
        Self {
            genre: None,
            limit: defaults.limit,
            shuffle: defaults.shuffle,
            seed: None,
            clip_seconds,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_defaults(&config.selection, config.render.clip_seconds)
    }
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Load a manifest and select from it.
pub fn select(manifest: &Manifest, options: &SelectionOptions) -> PowerHourResult<SelectionPlan> {
    let loaded = manifest.load()?;
    Ok(select_entries(loaded, options))
}

/// Run the selection steps over already-loaded entries.
///
/// Never fails: an empty result is a valid, empty plan. Every dropped or
/// surprising item leaves a warning on the plan.
pub fn select_entries(loaded: LoadedManifest, options: &SelectionOptions) -> SelectionPlan {
    let LoadedManifest {
        entries,
        mut warnings,
    } = loaded;
    let discovered = entries.len();

    // Keyed on the raw source; display forms of non-UTF-8 paths can collide.
    let mut seen: HashSet<ItemSource> = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        if seen.insert(entry.item.source.clone()) {
            items.push(entry.item);
        } else {
            warnings.push(Warning::new(
                WarningKind::DuplicateSource { line: entry.line },
                format!("duplicate of an earlier entry: {}", entry.item.source),
            ));
        }
    }
    let unique = items.len();

    if let Some(filter) = options.genre.as_deref().and_then(genre_filter) {
        if !items.iter().any(|item| !item.genres.is_empty()) {
            warnings.push(Warning::new(
                WarningKind::GenreDataMissing,
                "no genre tags available; matching on source text only",
            ));
        }
        items.retain(|item| filter.matches(item));
        tracing::debug!(filter = %filter.describe(), kept = items.len(), "Applied genre filter");
    }
    let filtered = items.len();

    if options.shuffle {
        match options.seed {
            Some(seed) => items.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => items.shuffle(&mut rand::thread_rng()),
        }
    }

    if let Some(limit) = options.limit {
        if limit > items.len() {
            warnings.push(Warning::new(
                WarningKind::FewerThanRequested {
                    requested: limit,
                    available: items.len(),
                },
                format!("requested {limit} items but only {} available", items.len()),
            ));
        }
        items.truncate(limit);
    }

    for (idx, item) in items.iter_mut().enumerate() {
        item.order_index = idx;
    }

    tracing::info!(
        discovered,
        unique,
        filtered,
        selected = items.len(),
        shuffled = options.shuffle,
        seed = ?options.seed,
        "Selection complete"
    );

    let mut plan = SelectionPlan::new(items, options.clip_seconds, options.seed);
    plan.warnings = warnings;
    plan
}
