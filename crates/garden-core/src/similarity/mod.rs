//! Lightweight text similarity: keyword sets compared with Jaccard overlap.
//!
//! Titles are reduced to their significant keywords and compared as sets.
//! The scores drive plant-time duplicate blocking and consolidation
//! suggestions.

mod duplicates;
mod keywords;
mod score;

pub use duplicates::{consolidate, rank, ConsolidationSuggestion, DuplicateFinder, SimilarIdea};
pub use keywords::{extract_keywords, is_stopword, KeywordSet};
pub use score::jaccard;
