use proptest::prelude::*;

use powerhour_playlist_model::PlaylistItem;
use powerhour_selection::{select_entries, LoadedManifest, ManifestEntry, SelectionOptions};

fn manifest_from(ids: &[u8]) -> LoadedManifest {
    LoadedManifest {
        entries: ids
            .iter()
            .enumerate()
            .map(|(idx, id)| ManifestEntry {
                item: PlaylistItem::remote(format!("video-{id:03}"), idx),
                line: idx + 1,
            })
            .collect(),
        warnings: Vec::new(),
    }
}

fn options(limit: Option<usize>, shuffle: bool, seed: u64) -> SelectionOptions {
    SelectionOptions {
        genre: None,
        limit,
        shuffle,
        seed: Some(seed),
        clip_seconds: 60.0,
    }
}

fn sources(items: &[PlaylistItem]) -> Vec<String> {
    items.iter().map(|i| i.source.to_string()).collect()
}

proptest! {
    #[test]
    fn prop_seeded_selection_is_idempotent(
        ids in prop::collection::vec(0u8..40, 0..60),
        seed in any::<u64>(),
        limit in prop::option::of(0usize..30),
    ) {
        let opts = options(limit, true, seed);
        let first = select_entries(manifest_from(&ids), &opts);
        let second = select_entries(manifest_from(&ids), &opts);
        prop_assert_eq!(sources(&first.items), sources(&second.items));
    }

    #[test]
    fn prop_limit_caps_length(
        ids in prop::collection::vec(0u8..40, 0..60),
        seed in any::<u64>(),
        limit in prop::option::of(0usize..30),
    ) {
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();

        let plan = select_entries(manifest_from(&ids), &options(limit, true, seed));
        match limit {
            Some(limit) => prop_assert_eq!(plan.len(), limit.min(unique.len())),
            None => prop_assert_eq!(plan.len(), unique.len()),
        }
        for (idx, item) in plan.items.iter().enumerate() {
            prop_assert_eq!(item.order_index, idx);
        }
    }

    #[test]
    fn prop_dedup_keeps_first_occurrence(ids in prop::collection::vec(0u8..20, 0..50)) {
        let plan = select_entries(manifest_from(&ids), &options(None, false, 0));

        let mut expected = Vec::new();
        for id in &ids {
            let source = format!("video-{id:03}");
            if !expected.contains(&source) {
                expected.push(source);
            }
        }
        prop_assert_eq!(sources(&plan.items), expected);
    }
}
