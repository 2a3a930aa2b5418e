//! Jaccard similarity between keyword sets.

use super::keywords::KeywordSet;

/// |A ∩ B| / |A ∪ B|, or 0.0 when either set is empty.
pub fn jaccard(a: &KeywordSet, b: &KeywordSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (a, b) = (a.as_set(), b.as_set());
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    intersection as f64 / union as f64
}
