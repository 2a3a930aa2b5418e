//! Near-duplicate detection and consolidation grouping over a user's ideas.

use std::collections::HashSet;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keywords::{extract_keywords, KeywordSet};
use super::score::jaccard;
use crate::error::GardenResult;
use crate::store::{GardenStore, IdeaQuery};
use crate::types::{Idea, IdeaId};

/// An existing idea scored against a candidate text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarIdea {
    pub idea: Idea,
    pub score: f64,
}

/// A group of active ideas that look like the same thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationSuggestion {
    pub primary: Idea,
    /// Best match first.
    pub others: Vec<SimilarIdea>,
    /// Score of the best match.
    pub similarity: f64,
}

/// Ranks a user's active ideas against candidate text.
pub struct DuplicateFinder {
    store: Arc<dyn GardenStore>,
}

impl DuplicateFinder {
    pub fn new(store: Arc<dyn GardenStore>) -> Self {
        Self { store }
    }

    /// Active ideas whose title scores at least `threshold` against `text`,
    /// best first. Ties keep the store's most-recently-updated-first order.
    pub fn find_similar(
        &self,
        user_id: &str,
        text: &str,
        threshold: f64,
    ) -> GardenResult<Vec<SimilarIdea>> {
        let keywords = extract_keywords(text);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let active = self.store.list_ideas(user_id, &IdeaQuery::active())?;
        let matches = rank(&keywords, active, threshold);
        debug!(user_id, matches = matches.len(), threshold, "Scanned for similar ideas");
        Ok(matches)
    }
}

/// Score every candidate title against `keywords`, keep those at or above
/// `threshold` and sort best first. The sort is stable.
pub fn rank(
    keywords: &KeywordSet,
    candidates: impl IntoIterator<Item = Idea>,
    threshold: f64,
) -> Vec<SimilarIdea> {
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SimilarIdea> = candidates
        .into_iter()
        .filter_map(|idea| {
            let score = jaccard(keywords, &extract_keywords(&idea.title));
            (score >= threshold).then_some(SimilarIdea { idea, score })
        })
        .collect();

    results.sort_by(|a, b| OrderedFloat(b.score).cmp(&OrderedFloat(a.score)));
    results
}

/// Greedily group similar ideas.
///
/// `ideas` are walked in the given order. Each idea not yet grouped is
/// scored against every other ungrouped idea; a non-empty match set forms a
/// suggestion and all of its members are marked as grouped.
pub fn consolidate(ideas: &[Idea], threshold: f64) -> Vec<ConsolidationSuggestion> {
    let mut grouped: HashSet<IdeaId> = HashSet::new();
    let mut suggestions = Vec::new();

    for idea in ideas {
        if grouped.contains(&idea.id) {
            continue;
        }

        let keywords = extract_keywords(&idea.title);
        let others: Vec<SimilarIdea> = rank(&keywords, ideas.iter().cloned(), threshold)
            .into_iter()
            .filter(|m| m.idea.id != idea.id && !grouped.contains(&m.idea.id))
            .collect();

        let Some(best) = others.first() else {
            continue;
        };
        let similarity = best.score;

        grouped.insert(idea.id);
        grouped.extend(others.iter().map(|m| m.idea.id));
        suggestions.push(ConsolidationSuggestion {
            primary: idea.clone(),
            others,
            similarity,
        });
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GardenError;
    use crate::store::MockGardenStore;
    use crate::types::Author;

    fn idea(title: &str) -> Idea {
        Idea::new("user1", title, "origin", Author::Human)
    }

    #[test]
    fn test_rank_filters_and_sorts() {
        let keywords = extract_keywords("Build a cat app");
        let candidates = vec![
            idea("Build a cat social app"),
            idea("Water the garden"),
            idea("Build a cat app"),
        ];
        let ranked = rank(&keywords, candidates, 0.25);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].idea.title, "Build a cat app");
        assert_eq!(ranked[0].score, 1.0);
        assert!((ranked[1].score - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let keywords = extract_keywords("garden tools");
        let first = idea("garden shed");
        let second = idea("garden hose");
        let ranked = rank(&keywords, vec![first.clone(), second.clone()], 0.1);
        assert_eq!(ranked[0].idea.id, first.id);
        assert_eq!(ranked[1].idea.id, second.id);
    }

    #[test]
    fn test_rank_threshold_is_inclusive() {
        // {garden, tools} vs {garden, shed, tools, rack}: 2 / 4
        let keywords = extract_keywords("garden tools");
        let ranked = rank(&keywords, vec![idea("garden shed tools rack")], 0.5);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_find_similar_empty_text_skips_store() {
        let mut store = MockGardenStore::new();
        store.expect_list_ideas().never();
        let finder = DuplicateFinder::new(Arc::new(store));
        assert!(finder.find_similar("user1", "the and", 0.25).unwrap().is_empty());
    }

    #[test]
    fn test_find_similar_propagates_store_failure() {
        let mut store = MockGardenStore::new();
        store
            .expect_list_ideas()
            .returning(|_, _| Err(GardenError::database("disk on fire")));
        let finder = DuplicateFinder::new(Arc::new(store));
        let result = finder.find_similar("user1", "Build a cat app", 0.25);
        assert!(matches!(result, Err(GardenError::Database { .. })));
    }

    #[test]
    fn test_consolidate_groups_each_idea_once() {
        let ideas = vec![
            idea("Build a cat app"),
            idea("Build a cat social app"),
            idea("Cat app for shelters"),
            idea("Repaint the kitchen"),
        ];
        let suggestions = consolidate(&ideas, 0.3);

        assert_eq!(suggestions.len(), 1);
        let group = &suggestions[0];
        assert_eq!(group.primary.id, ideas[0].id);
        assert_eq!(group.others.len(), 2);
        assert_eq!(group.similarity, group.others[0].score);
    }

    #[test]
    fn test_consolidate_nothing_similar() {
        let ideas = vec![idea("Repaint the kitchen"), idea("Learn the violin")];
        assert!(consolidate(&ideas, 0.3).is_empty());
    }
}
