//! Keyword extraction for bag-of-words similarity.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "as", "is", "was", "are", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "could", "should", "may", "might", "can", "this",
        "that", "these", "those", "it", "its", "they", "them", "their", "we", "our", "via", "use",
        "using", "into", "during", "before", "after", "about", "between", "through", "under",
        "over", "each", "all", "any", "both", "more", "most", "other", "very", "just", "really",
        "much", "too", "also",
    ]
    .into_iter()
    .collect()
});

// Everything that is neither a word character nor whitespace.
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Tokens shorter than this (in characters) are dropped.
const MIN_KEYWORD_CHARS: usize = 3;

/// Unordered, duplicate-free set of significant tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet(HashSet<String>);

impl KeywordSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub(crate) fn as_set(&self) -> &HashSet<String> {
        &self.0
    }
}

impl FromIterator<String> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether `token` is in the stopword list.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Normalize free text into its significant keywords.
///
/// Lowercases, strips punctuation, splits on whitespace and drops short
/// tokens and stopwords. Empty or all-stopword input yields an empty set.
pub fn extract_keywords(text: &str) -> KeywordSet {
    let lowered = text.to_lowercase();
    let cleaned = PUNCTUATION.replace_all(&lowered, "");

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}
