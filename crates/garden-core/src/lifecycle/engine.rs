//! The idea state machine.
//!
//! ```text
//!  CAPTURED --refine--> REFINING --refine--> MATURE --finalize--> ARCHIVE (FINALIZED)
//!      \___________________\___________________\----discard----> ARCHIVE (DISCARDED)
//! ```
//!
//! Sections only ever advance. Every mutation is committed as one
//! [`WriteBatch`] guarded by the revision the idea was read at, so a
//! concurrent writer makes the later commit fail instead of being overwritten.
//! The same batch carries the XP and lifetime counters for the transition and,
//! for anything entering the archive, the archive bound.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::archive::ArchiveEvictor;
use crate::config::{LifecycleConfig, RewardConfig};
use crate::error::{GardenError, GardenResult};
use crate::progression::ProgressEvent;
use crate::store::{CommitReceipt, GardenStore, WriteBatch};
use crate::types::{
    Author, Idea, IdeaId, IdeaStatus, LogKind, RefinementLogEntry, Section, UserProfile,
};

/// Reason recorded when a discard does not give one.
pub const DEFAULT_DISCARD_REASON: &str = "No reason provided";

/// Section an active idea should occupy after reaching `refinements`.
///
/// Maturity wins over refining; an idea never moves backwards.
pub fn next_section(current: Section, refinements: u32, config: &LifecycleConfig) -> Section {
    if refinements >= config.maturity_threshold && current != Section::Mature {
        Section::Mature
    } else if refinements >= config.refining_threshold && current == Section::Captured {
        Section::Refining
    } else {
        current
    }
}

/// Result of a single-idea transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The idea as stored after the transition.
    pub idea: Idea,
    pub previous_section: Section,
    pub previous_status: IdeaStatus,
    /// Archived ideas deleted to make room, newest first.
    pub evicted: Vec<IdeaId>,
}

impl Transition {
    /// Whether an active idea moved to a later section.
    pub fn promoted(&self) -> bool {
        self.idea.is_active() && self.idea.section != self.previous_section
    }

    /// The section reached, only when promoted.
    pub fn new_section(&self) -> Option<Section> {
        self.promoted().then_some(self.idea.section)
    }
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub primary: Idea,
    /// Absorbed ideas, now discarded and pointing at the primary.
    pub absorbed: Vec<Idea>,
    pub evicted: Vec<IdeaId>,
}

/// Applies lifecycle transitions to stored ideas.
pub struct LifecycleEngine {
    store: Arc<dyn GardenStore>,
    config: LifecycleConfig,
    rewards: RewardConfig,
    archive: ArchiveEvictor,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn GardenStore>, config: LifecycleConfig) -> Self {
        Self {
            archive: ArchiveEvictor::new(store.clone(), config.archive_capacity),
            store,
            config,
            rewards: RewardConfig::default(),
        }
    }

    /// Use `rewards` for the XP committed with each transition.
    pub fn with_rewards(mut self, rewards: RewardConfig) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Capture a new idea in CAPTURED with no refinements.
    pub fn create(
        &self,
        user_id: &str,
        title: &str,
        origin: &str,
        author: Author,
    ) -> GardenResult<Idea> {
        require_non_blank("user_id", user_id)?;
        require_non_blank("title", title)?;
        require_non_blank("origin", origin)?;

        let idea = Idea::new(user_id, title, origin, author);
        let batch = WriteBatch::new().insert(idea);
        let (idea, _) = self.commit_one(user_id, ProgressEvent::Created, batch)?;
        debug!(user_id, idea_id = %idea.id, title = %idea.title, "Idea captured");
        Ok(idea)
    }

    /// Append a refinement and advance the section when a threshold is crossed.
    pub fn refine(
        &self,
        user_id: &str,
        idea_id: &IdeaId,
        content: &str,
        author: Author,
    ) -> GardenResult<Transition> {
        let mut idea = self.load(user_id, idea_id)?;
        if !idea.is_active() {
            return Err(GardenError::not_active(idea_id));
        }
        require_non_blank("content", content)?;

        let (previous_section, previous_status) = (idea.section, idea.status);
        idea.refinements += 1;
        idea.section = next_section(idea.section, idea.refinements, &self.config);
        idea.updated_at = Utc::now();

        let log = RefinementLogEntry::new(idea.id, content.trim(), author, LogKind::Refinement);
        let batch = WriteBatch::new().update(idea).log(log);
        let (idea, evicted) = self.commit_one(user_id, ProgressEvent::Refined, batch)?;

        let transition = Transition {
            idea,
            previous_section,
            previous_status,
            evicted,
        };
        if transition.promoted() {
            info!(
                user_id,
                idea_id = %idea_id,
                from = %previous_section,
                to = %transition.idea.section,
                "Idea promoted"
            );
        } else {
            debug!(user_id, idea_id = %idea_id, refinements = transition.idea.refinements, "Idea refined");
        }
        Ok(transition)
    }

    /// Move a mature idea to the archive as FINALIZED.
    pub fn finalize(
        &self,
        user_id: &str,
        idea_id: &IdeaId,
        author: Author,
    ) -> GardenResult<Transition> {
        let mut idea = self.load(user_id, idea_id)?;
        if idea.is_archived() {
            return Err(GardenError::not_active(idea_id));
        }
        if idea.refinements < self.config.maturity_threshold {
            return Err(GardenError::immature(
                idea_id,
                idea.refinements,
                self.config.maturity_threshold,
            ));
        }

        let (previous_section, previous_status) = (idea.section, idea.status);
        idea.archive(IdeaStatus::Finalized, Utc::now());

        let log = RefinementLogEntry::new(idea.id, "Finalized!", author, LogKind::Finalize);
        let batch = self.archive.bound(user_id, WriteBatch::new().update(idea).log(log));
        let (idea, evicted) = self.commit_one(user_id, ProgressEvent::Finalized, batch)?;
        debug!(user_id, idea_id = %idea_id, "Idea finalized");

        Ok(Transition {
            idea,
            previous_section,
            previous_status,
            evicted,
        })
    }

    /// Move an idea to the archive as DISCARDED. Allowed in any state.
    pub fn discard(
        &self,
        user_id: &str,
        idea_id: &IdeaId,
        reason: Option<&str>,
        author: Author,
    ) -> GardenResult<Transition> {
        let mut idea = self.load(user_id, idea_id)?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_DISCARD_REASON);

        let (previous_section, previous_status) = (idea.section, idea.status);
        idea.archive(IdeaStatus::Discarded, Utc::now());

        let log = RefinementLogEntry::new(
            idea.id,
            format!("Discarded: {}", reason),
            author,
            LogKind::Discard,
        );
        let batch = self.archive.bound(user_id, WriteBatch::new().update(idea).log(log));
        let (idea, evicted) = self.commit_one(user_id, ProgressEvent::Discarded, batch)?;
        debug!(user_id, idea_id = %idea_id, reason, "Idea discarded");

        Ok(Transition {
            idea,
            previous_section,
            previous_status,
            evicted,
        })
    }

    /// Fold `others` into `primary`.
    ///
    /// All participants must be distinct, owned by the user and active. The
    /// primary receives the sum of every participant's refinements plus one
    /// for the synthesis; the others are discarded and point at the primary.
    /// Nothing is written unless every participant passes.
    pub fn merge(
        &self,
        user_id: &str,
        primary_id: &IdeaId,
        other_ids: &[IdeaId],
        synthesis: &str,
        author: Author,
    ) -> GardenResult<MergeReport> {
        if other_ids.is_empty() {
            return Err(GardenError::validation_with_suggestion(
                "merge requires at least one other idea",
                "Pass the ideas to fold into the primary",
            ));
        }
        if other_ids.contains(primary_id) {
            return Err(GardenError::validation(
                "the primary idea cannot be merged into itself",
            ));
        }
        let distinct: HashSet<&IdeaId> = other_ids.iter().collect();
        if distinct.len() != other_ids.len() {
            return Err(GardenError::validation("merge participants must be distinct"));
        }
        require_non_blank("synthesis", synthesis)?;

        let mut primary = self.load_active_participant(user_id, primary_id)?;
        let mut others = Vec::with_capacity(other_ids.len());
        for id in other_ids {
            others.push(self.load_active_participant(user_id, id)?);
        }

        let now = Utc::now();
        let absorbed_refinements: u32 = others.iter().map(|o| o.refinements).sum();
        primary.refinements += absorbed_refinements + 1;
        primary.section = next_section(primary.section, primary.refinements, &self.config);
        primary.updated_at = now;

        let titles: Vec<&str> = others.iter().map(|o| o.title.as_str()).collect();
        let log = RefinementLogEntry::new(
            primary.id,
            format!("Merged with [{}]. Synthesis: {}", titles.join(", "), synthesis.trim()),
            author,
            LogKind::Merge,
        );

        let event = ProgressEvent::Merged {
            absorbed: others.len() as u64,
        };
        let mut batch = WriteBatch::new().update(primary);
        for mut other in others {
            other.archive(IdeaStatus::Discarded, now);
            other.merged_into = Some(*primary_id);
            batch = batch.update(other);
        }
        let batch = self.archive.bound(user_id, batch.log(log));

        let receipt = self.commit(user_id, event, batch)?;
        let mut written = receipt.ideas.into_iter();
        let primary = written
            .next()
            .ok_or_else(|| GardenError::Internal("merge commit returned no ideas".to_string()))?;
        let absorbed: Vec<Idea> = written.collect();

        info!(
            user_id,
            primary_id = %primary_id,
            absorbed = absorbed.len(),
            refinements = primary.refinements,
            "Ideas merged"
        );
        Ok(MergeReport {
            primary,
            absorbed,
            evicted: receipt.evicted,
        })
    }

    fn load(&self, user_id: &str, idea_id: &IdeaId) -> GardenResult<Idea> {
        self.store
            .get_idea(user_id, idea_id)?
            .ok_or_else(|| GardenError::not_found(idea_id.to_string()))
    }

    fn load_active_participant(&self, user_id: &str, idea_id: &IdeaId) -> GardenResult<Idea> {
        match self.store.get_idea(user_id, idea_id)? {
            Some(idea) if idea.is_active() => Ok(idea),
            _ => Err(GardenError::merge_participants()),
        }
    }

    /// Commit `batch` together with the progress earned by `event`.
    fn commit(
        &self,
        user_id: &str,
        event: ProgressEvent,
        batch: WriteBatch,
    ) -> GardenResult<CommitReceipt> {
        let delta = event.delta(&self.rewards);
        let receipt = self.store.commit(batch.progress(user_id, delta.clone()))?;

        if let Some(profile) = &receipt.profile {
            if UserProfile::level_for_xp(profile.xp.saturating_sub(delta.xp)) < profile.level {
                info!(user_id, level = profile.level, "Level up");
            }
        }
        if !receipt.evicted.is_empty() {
            info!(
                user_id,
                evicted = receipt.evicted.len(),
                capacity = self.archive.capacity(),
                "Evicted archived ideas"
            );
        }
        Ok(receipt)
    }

    fn commit_one(
        &self,
        user_id: &str,
        event: ProgressEvent,
        batch: WriteBatch,
    ) -> GardenResult<(Idea, Vec<IdeaId>)> {
        let receipt = self.commit(user_id, event, batch)?;
        let idea = receipt
            .ideas
            .into_iter()
            .next()
            .ok_or_else(|| GardenError::Internal("commit returned no ideas".to_string()))?;
        Ok((idea, receipt.evicted))
    }
}

fn require_non_blank(field: &str, value: &str) -> GardenResult<()> {
    if value.trim().is_empty() {
        return Err(GardenError::missing_field(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::{MockGardenStore, SqliteGardenStore};

    fn engine() -> LifecycleEngine {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        LifecycleEngine::new(store, LifecycleConfig::default())
    }

    fn refine_times(engine: &LifecycleEngine, idea: &Idea, n: u32) -> Vec<Transition> {
        (0..n)
            .map(|i| {
                engine
                    .refine("user1", &idea.id, &format!("thought {}", i), Author::Human)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_next_section_rules() {
        let cfg = LifecycleConfig::default();
        assert_eq!(next_section(Section::Captured, 2, &cfg), Section::Captured);
        assert_eq!(next_section(Section::Captured, 3, &cfg), Section::Refining);
        assert_eq!(next_section(Section::Refining, 4, &cfg), Section::Refining);
        assert_eq!(next_section(Section::Refining, 5, &cfg), Section::Mature);
        // A merge can jump straight past refining.
        assert_eq!(next_section(Section::Captured, 7, &cfg), Section::Mature);
        assert_eq!(next_section(Section::Mature, 9, &cfg), Section::Mature);
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let engine = engine();
        let err = engine.create("user1", "  ", "origin", Author::Human).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);
        let err = engine.create("user1", "title", "", Author::Human).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);
    }

    #[test]
    fn test_refine_promotes_on_threshold_only() {
        let engine = engine();
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();

        let steps = refine_times(&engine, &idea, 5);
        let promotions: Vec<Option<Section>> = steps.iter().map(|t| t.new_section()).collect();
        assert_eq!(
            promotions,
            vec![None, None, Some(Section::Refining), None, Some(Section::Mature)]
        );
        assert_eq!(steps[4].idea.refinements, 5);
    }

    #[test]
    fn test_refine_missing_or_foreign_idea() {
        let engine = engine();
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();

        let err = engine.refine("user2", &idea.id, "hi", Author::Human).unwrap_err();
        assert!(matches!(err, GardenError::NotFound { .. }));
    }

    #[test]
    fn test_refine_blank_content() {
        let engine = engine();
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();
        let err = engine.refine("user1", &idea.id, " ", Author::Human).unwrap_err();
        assert!(matches!(err, GardenError::Validation { .. }));
    }

    #[test]
    fn test_refine_archived_idea_fails() {
        let engine = engine();
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();
        engine.discard("user1", &idea.id, None, Author::Human).unwrap();

        let err = engine.refine("user1", &idea.id, "more", Author::Human).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdeaNotActive);
    }

    #[test]
    fn test_finalize_requires_maturity() {
        let engine = engine();
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();
        refine_times(&engine, &idea, 4);

        let err = engine.finalize("user1", &idea.id, Author::Human).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdeaImmature);
        assert!(err.to_string().contains("5"));

        refine_times(&engine, &idea, 1);
        let done = engine.finalize("user1", &idea.id, Author::Human).unwrap();
        assert_eq!(done.idea.status, IdeaStatus::Finalized);
        assert_eq!(done.idea.section, Section::Archive);
        assert!(done.idea.finalized_at.is_some());
        assert!(!done.promoted());
    }

    #[test]
    fn test_finalize_twice_fails() {
        let engine = engine();
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();
        refine_times(&engine, &idea, 5);
        engine.finalize("user1", &idea.id, Author::Human).unwrap();

        let err = engine.finalize("user1", &idea.id, Author::Human).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdeaNotActive);
    }

    #[test]
    fn test_discard_uses_default_reason() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let engine = LifecycleEngine::new(store.clone(), LifecycleConfig::default());
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();

        let done = engine.discard("user1", &idea.id, Some("  "), Author::Human).unwrap();
        assert_eq!(done.idea.status, IdeaStatus::Discarded);

        let logs = store.list_logs(&idea.id).unwrap();
        assert_eq!(logs[0].content, "Discarded: No reason provided");
        assert_eq!(logs[0].kind, LogKind::Discard);
    }

    #[test]
    fn test_merge_sums_refinements_and_absorbs() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let engine = LifecycleEngine::new(store.clone(), LifecycleConfig::default());
        let primary = engine.create("user1", "Cat app", "pets", Author::Human).unwrap();
        let a = engine.create("user1", "Cat social app", "pets", Author::Human).unwrap();
        let b = engine.create("user1", "Cat photos", "pets", Author::Human).unwrap();
        refine_times(&engine, &primary, 1);
        refine_times(&engine, &a, 2);

        let report = engine
            .merge("user1", &primary.id, &[a.id, b.id], "one pet app", Author::Human)
            .unwrap();

        assert_eq!(report.primary.refinements, 1 + 2 + 0 + 1);
        assert_eq!(report.primary.section, Section::Refining);
        assert_eq!(report.absorbed.len(), 2);
        for absorbed in &report.absorbed {
            assert_eq!(absorbed.status, IdeaStatus::Discarded);
            assert_eq!(absorbed.section, Section::Archive);
            assert_eq!(absorbed.merged_into, Some(primary.id));
        }

        let logs = store.list_logs(&primary.id).unwrap();
        assert_eq!(
            logs[0].content,
            "Merged with [Cat social app, Cat photos]. Synthesis: one pet app"
        );
    }

    #[test]
    fn test_merge_validation() {
        let engine = engine();
        let primary = engine.create("user1", "Cat app", "pets", Author::Human).unwrap();
        let other = engine.create("user1", "Dog app", "pets", Author::Human).unwrap();

        let cases: Vec<(Vec<IdeaId>, &str)> = vec![
            (vec![], "text"),
            (vec![primary.id], "text"),
            (vec![other.id, other.id], "text"),
            (vec![other.id], "   "),
        ];
        for (others, synthesis) in cases {
            let err = engine
                .merge("user1", &primary.id, &others, synthesis, Author::Human)
                .unwrap_err();
            assert!(matches!(err, GardenError::Validation { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_merge_with_inactive_participant_changes_nothing() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let engine = LifecycleEngine::new(store.clone(), LifecycleConfig::default());
        let primary = engine.create("user1", "Cat app", "pets", Author::Human).unwrap();
        let live = engine.create("user1", "Cat social app", "pets", Author::Human).unwrap();
        let gone = engine.create("user1", "Cat photos", "pets", Author::Human).unwrap();
        engine.discard("user1", &gone.id, None, Author::Human).unwrap();

        let before_primary = store.get_idea("user1", &primary.id).unwrap();
        let before_live = store.get_idea("user1", &live.id).unwrap();

        let err = engine
            .merge("user1", &primary.id, &[live.id, gone.id], "combined", Author::Human)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdeaMergeParticipants);

        assert_eq!(store.get_idea("user1", &primary.id).unwrap(), before_primary);
        assert_eq!(store.get_idea("user1", &live.id).unwrap(), before_live);
        assert!(store.list_logs(&primary.id).unwrap().is_empty());
    }

    #[test]
    fn test_transitions_commit_progress() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let engine = LifecycleEngine::new(store.clone(), LifecycleConfig::default());
        let idea = engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();
        refine_times(&engine, &idea, 5);
        engine.finalize("user1", &idea.id, Author::Human).unwrap();

        let profile = store.load_profile("user1").unwrap();
        assert_eq!(profile.xp, 10 + 5 * 5 + 50);
        assert_eq!(profile.ideas_created, 1);
        assert_eq!(profile.refinements, 5);
        assert_eq!(profile.finalized, 1);
    }

    #[test]
    fn test_custom_rewards() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let rewards = RewardConfig {
            create_xp: 1,
            ..RewardConfig::default()
        };
        let engine =
            LifecycleEngine::new(store.clone(), LifecycleConfig::default()).with_rewards(rewards);
        engine.create("user1", "Plan a trip", "felt like it", Author::Human).unwrap();
        assert_eq!(store.load_profile("user1").unwrap().xp, 1);
    }

    #[test]
    fn test_discard_trims_archive_in_same_commit() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let config = LifecycleConfig {
            archive_capacity: 2,
            ..LifecycleConfig::default()
        };
        let engine = LifecycleEngine::new(store.clone(), config);

        let mut ids = Vec::new();
        let mut last = None;
        for i in 0..3 {
            let idea = engine
                .create("user1", &format!("idea number {}", i), "why", Author::Human)
                .unwrap();
            ids.push(idea.id);
            last = Some(engine.discard("user1", &idea.id, None, Author::Human).unwrap());
        }

        assert_eq!(last.unwrap().evicted, vec![ids[0]]);
        assert!(store.get_idea("user1", &ids[0]).unwrap().is_none());
        assert_eq!(store.load_profile("user1").unwrap().discarded, 3);
    }

    #[test]
    fn test_merge_commits_counters() {
        let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
        let engine = LifecycleEngine::new(store.clone(), LifecycleConfig::default());
        let primary = engine.create("user1", "Cat app", "pets", Author::Human).unwrap();
        let a = engine.create("user1", "Cat social app", "pets", Author::Human).unwrap();
        let b = engine.create("user1", "Cat photos", "pets", Author::Human).unwrap();

        engine
            .merge("user1", &primary.id, &[a.id, b.id], "one pet app", Author::Human)
            .unwrap();

        let profile = store.load_profile("user1").unwrap();
        assert_eq!(profile.xp, 3 * 10);
        assert_eq!(profile.refinements, 1);
        assert_eq!(profile.discarded, 2);
    }

    #[test]
    fn test_finalize_sends_progress_and_bound_in_one_batch() {
        let mut idea = Idea::new("user1", "Plan a trip", "why", Author::Human);
        idea.refinements = 5;
        idea.section = Section::Mature;
        let stored = idea.clone();

        let mut store = MockGardenStore::new();
        store
            .expect_get_idea()
            .returning(move |_, _| Ok(Some(stored.clone())));
        store
            .expect_commit()
            .withf(|batch| {
                batch.archive_bound.is_some()
                    && batch
                        .progress
                        .as_ref()
                        .is_some_and(|change| change.delta.finalized == 1 && change.delta.xp == 50)
            })
            .times(1)
            .returning(|_| Err(GardenError::database("disk full")));
        store.expect_apply_progress().never();
        let engine = LifecycleEngine::new(Arc::new(store), LifecycleConfig::default());

        let err = engine.finalize("user1", &idea.id, Author::Human).unwrap_err();
        assert!(matches!(err, GardenError::Database { .. }));
    }
}
