//! Sticker keyword matching.

use crate::models::{Item, Sticker};

/// Case-insensitive substring matcher over sticker names.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Blank keywords are dropped; an empty matcher matches nothing.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches_sticker(&self, sticker: &Sticker) -> bool {
        let name = sticker.name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// True when any keyword occurs in any attached sticker name.
    pub fn matches(&self, item: &Item) -> bool {
        item.stickers.iter().any(|s| self.matches_sticker(s))
    }
}
