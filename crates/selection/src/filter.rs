//! Genre predicates.
//!
//! A genre request matches an item through either of two strategies:
//! the source text (path or identifier) contains the genre string, or one
//! of the item's tags equals or contains it. [`genre_filter`] composes both
//! with [`AnyOf`].

use powerhour_playlist_model::PlaylistItem;

/// A yes/no test over a playlist item.
pub trait ItemPredicate: Send + Sync {
    fn matches(&self, item: &PlaylistItem) -> bool;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Case-insensitive substring match against the item's source text.
#[derive(Debug, Clone)]
pub struct SourceTextContains {
    needle: String,
}

impl SourceTextContains {
    pub fn new(needle: &str) -> Self {
        Self {
            needle: needle.trim().to_lowercase(),
        }
    }
}

impl ItemPredicate for SourceTextContains {
    fn matches(&self, item: &PlaylistItem) -> bool {
        !self.needle.is_empty() && item.source.search_text().to_lowercase().contains(&self.needle)
    }

    fn describe(&self) -> String {
        format!("source contains {:?}", self.needle)
    }
}

/// Exact or partial match against the item's tag set.
#[derive(Debug, Clone)]
pub struct TagMatches {
    needle: String,
}

impl TagMatches {
    pub fn new(needle: &str) -> Self {
        Self {
            needle: needle.trim().to_lowercase(),
        }
    }
}

impl ItemPredicate for TagMatches {
    fn matches(&self, item: &PlaylistItem) -> bool {
        !self.needle.is_empty()
            && item
                .genres
                .iter()
                .any(|tag| tag == &self.needle || tag.contains(&self.needle))
    }

    fn describe(&self) -> String {
        format!("tag matches {:?}", self.needle)
    }
}

/// Matches when any inner predicate matches.
pub struct AnyOf {
    predicates: Vec<Box<dyn ItemPredicate>>,
}

impl AnyOf {
    pub fn new(predicates: Vec<Box<dyn ItemPredicate>>) -> Self {
        Self { predicates }
    }
}

impl ItemPredicate for AnyOf {
    fn matches(&self, item: &PlaylistItem) -> bool {
        self.predicates.iter().any(|p| p.matches(item))
    }

    fn describe(&self) -> String {
        self.predicates
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

/// Build the genre predicate, or `None` when the request is blank.
pub fn genre_filter(genre: &str) -> Option<AnyOf> {
    if genre.trim().is_empty() {
        return None;
    }
    Some(AnyOf::new(vec![
        Box::new(SourceTextContains::new(genre)),
        Box::new(TagMatches::new(genre)),
    ]))
}
