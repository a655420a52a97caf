//! Non-fatal diagnostics collected while building a plan.

use serde::{Deserialize, Serialize};

/// What went wrong, with enough location data to find it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// A manifest row was missing its identifier and was skipped.
    SkippedRow { line: usize },

    /// A manifest entry repeated an earlier source and was dropped.
    DuplicateSource { line: usize },

    /// A source's metadata could not be read; the item was dropped.
    ProbeFailed { index: usize },

    /// A source is shorter than the clip length and is used in full.
    ShortSource { index: usize },

    /// The crossfade between `boundary` and `boundary + 1` was shortened.
    CrossfadeShortened { boundary: usize },

    /// A genre filter was requested but no item carries tags.
    GenreDataMissing,

    /// The limit asks for more items than survived filtering.
    FewerThanRequested { requested: usize, available: usize },
}

/// A warning reported alongside a still-successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(flatten)]
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            WarningKind::SkippedRow { line } | WarningKind::DuplicateSource { line } => {
                write!(f, "line {line}: {}", self.message)
            }
            WarningKind::ProbeFailed { index } | WarningKind::ShortSource { index } => {
                write!(f, "item #{}: {}", index + 1, self.message)
            }
            WarningKind::CrossfadeShortened { boundary } => {
                write!(f, "items #{}/#{}: {}", boundary + 1, boundary + 2, self.message)
            }
            WarningKind::GenreDataMissing | WarningKind::FewerThanRequested { .. } => {
                write!(f, "{}", self.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display_is_one_based() {
        let w = Warning::new(
            WarningKind::ShortSource { index: 0 },
            "shorter than requested clip length",
        );
        assert_eq!(w.to_string(), "item #1: shorter than requested clip length");
    }

    #[test]
    fn test_warning_serializes_flat() {
        let w = Warning::new(WarningKind::CrossfadeShortened { boundary: 2 }, "shortened");
        let value = serde_json::to_value(&w).unwrap();
        assert_eq!(value["kind"], "crossfade_shortened");
        assert_eq!(value["boundary"], 2);
        assert_eq!(value["message"], "shortened");
    }
}
