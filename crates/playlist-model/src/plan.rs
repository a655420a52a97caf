//! Selection plans: the output contract of the selection engine.

use serde::{Deserialize, Serialize};

use powerhour_common::error::{PowerHourError, PowerHourResult};

use crate::item::PlaylistItem;
use crate::warning::Warning;

/// Ordered, deduplicated items ready for a render or embed stage.
///
/// An empty plan is a valid selection result. Consumers call
/// [`SelectionPlan::require_items`] to reject it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPlan {
    pub items: Vec<PlaylistItem>,

    /// Duration applied uniformly to every item.
    pub clip_seconds: f64,

    /// Shuffle seed, when the order is reproducible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Problems that did not stop the selection.
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl SelectionPlan {
    pub fn new(items: Vec<PlaylistItem>, clip_seconds: f64, seed: Option<u64>) -> Self {
        Self {
            items,
            clip_seconds,
            seed,
            warnings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The items, or an input error if there are none.
    pub fn require_items(&self) -> PowerHourResult<&[PlaylistItem]> {
        if self.items.is_empty() {
            return Err(PowerHourError::input(
                "Selection is empty: no items remain after filtering",
            ));
        }
        Ok(&self.items)
    }

    /// Nominal start of an item on the playlist clock.
    pub fn nominal_offset(&self, item: &PlaylistItem) -> f64 {
        item.order_index as f64 * self.clip_seconds
    }

    /// Nominal playlist length if every item plays the full clip.
    pub fn nominal_duration(&self) -> f64 {
        self.items.len() as f64 * self.clip_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_is_rejected_by_consumers() {
        let plan = SelectionPlan::new(vec![], 60.0, None);
        assert!(plan.is_empty());
        let err = plan.require_items().unwrap_err();
        assert!(matches!(err, PowerHourError::Input { .. }));
    }

    #[test]
    fn test_nominal_offsets_follow_order_index() {
        let items = vec![
            PlaylistItem::remote("aaaaaaaaaaa", 0),
            PlaylistItem::remote("bbbbbbbbbbb", 1),
            PlaylistItem::remote("ccccccccccc", 2),
        ];
        let plan = SelectionPlan::new(items, 15.0, Some(7));
        assert_eq!(plan.nominal_offset(&plan.items[2]), 30.0);
        assert_eq!(plan.nominal_duration(), 45.0);
    }
}
