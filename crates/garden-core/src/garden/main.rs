//! The `Garden` facade.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::outcome::{
    CreateOutcome, GardenOverview, GardenStats, IdeaDetail, IdeaOutcome, PlantOptions,
    RefineOutcome,
};
use super::reminders::ReminderDigest;
use crate::config::GardenConfig;
use crate::error::{GardenError, GardenResult};
use crate::events::{EventBus, GardenEvent};
use crate::lifecycle::{LifecycleEngine, DEFAULT_DISCARD_REASON};
use crate::progression::{find_achievement, ProgressionEngine, StreakUpdate};
use crate::similarity::{consolidate, ConsolidationSuggestion, DuplicateFinder, SimilarIdea};
use crate::store::{GardenStore, IdeaQuery, SqliteGardenStore};
use crate::types::{Author, Idea, IdeaId, Section, UserProfile};

/// Single entry point composing duplicate detection, the lifecycle engine,
/// the archive bound and the progression layer over one store.
///
/// Each lifecycle transition commits in one transaction together with its
/// XP, lifetime counters and archive trim. Achievements are checked after
/// the commit; they derive from the committed counters, so a failed check
/// is caught up by the next one.
pub struct Garden {
    config: GardenConfig,
    store: Arc<dyn GardenStore>,
    finder: DuplicateFinder,
    lifecycle: LifecycleEngine,
    progression: ProgressionEngine,
    event_bus: Option<EventBus>,
}

impl Garden {
    /// Create a garden over an existing store.
    pub fn new(config: GardenConfig, store: Arc<dyn GardenStore>) -> GardenResult<Self> {
        config.validate()?;

        Ok(Self {
            finder: DuplicateFinder::new(store.clone()),
            lifecycle: LifecycleEngine::new(store.clone(), config.lifecycle.clone())
                .with_rewards(config.rewards.clone()),
            progression: ProgressionEngine::new(store.clone(), config.rewards.clone()),
            store,
            config,
            event_bus: None,
        })
    }

    /// Open the SQLite database at `config.db_path`.
    pub fn open(config: GardenConfig) -> GardenResult<Self> {
        let store = SqliteGardenStore::new(&config.db_path)?;
        Self::new(config, Arc::new(store))
    }

    /// Create a garden backed by an in-memory database (for testing)
    pub fn in_memory(config: GardenConfig) -> GardenResult<Self> {
        Self::new(config, Arc::new(SqliteGardenStore::in_memory()?))
    }

    /// Publish a [`GardenEvent`] on `event_bus` after every committed change.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &GardenConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    /// Capture an idea unless it looks like an existing active one.
    ///
    /// Matches above the scan threshold are always returned. When any of
    /// them is above the block threshold and `options.force` is false,
    /// nothing is created and `blocked` is set.
    pub fn create_idea(
        &self,
        user_id: &str,
        title: &str,
        origin: &str,
        options: PlantOptions,
    ) -> GardenResult<CreateOutcome> {
        for (field, value) in [("user_id", user_id), ("title", title), ("origin", origin)] {
            if value.trim().is_empty() {
                return Err(GardenError::missing_field(field));
            }
        }

        let similarity = &self.config.similarity;
        let similar_matches =
            self.finder
                .find_similar(user_id, title, similarity.duplicate_scan_threshold)?;
        let is_duplicate = similar_matches
            .iter()
            .any(|m| m.score > similarity.duplicate_block_threshold);

        if is_duplicate && !options.force {
            info!(
                user_id,
                title,
                matches = similar_matches.len(),
                "Capture blocked by near-duplicate"
            );
            return Ok(CreateOutcome {
                idea: None,
                similar_matches,
                blocked: true,
                unlocked: Vec::new(),
            });
        }

        let idea = self.lifecycle.create(user_id, title, origin, options.author)?;
        self.emit(GardenEvent::Planted {
            user_id: user_id.to_string(),
            idea_id: idea.id,
            title: idea.title.clone(),
            timestamp: idea.created_at,
        });

        Ok(CreateOutcome {
            idea: Some(idea),
            similar_matches,
            blocked: false,
            unlocked: self.unlock_after_commit(user_id),
        })
    }

    /// Append a refinement to an active idea.
    pub fn refine_idea(
        &self,
        user_id: &str,
        idea_id: IdeaId,
        content: &str,
        author: Author,
    ) -> GardenResult<RefineOutcome> {
        let transition = self.lifecycle.refine(user_id, &idea_id, content, author)?;

        let promoted = transition.promoted();
        let new_section = transition.new_section();
        let idea = transition.idea;
        self.emit(GardenEvent::Refined {
            user_id: user_id.to_string(),
            idea_id: idea.id,
            refinements: idea.refinements,
            section: idea.section,
            promoted,
            timestamp: idea.updated_at,
        });

        Ok(RefineOutcome {
            idea,
            promoted,
            new_section,
            unlocked: self.unlock_after_commit(user_id),
        })
    }

    /// Finalize a mature idea.
    pub fn finalize_idea(
        &self,
        user_id: &str,
        idea_id: IdeaId,
        author: Author,
    ) -> GardenResult<IdeaOutcome> {
        let transition = self.lifecycle.finalize(user_id, &idea_id, author)?;
        let idea = transition.idea;
        self.emit(GardenEvent::Finalized {
            user_id: user_id.to_string(),
            idea_id: idea.id,
            timestamp: idea.updated_at,
        });
        self.emit_evicted(user_id, transition.evicted);

        Ok(IdeaOutcome {
            idea,
            unlocked: self.unlock_after_commit(user_id),
        })
    }

    /// Discard an idea in any state.
    pub fn discard_idea(
        &self,
        user_id: &str,
        idea_id: IdeaId,
        reason: Option<&str>,
        author: Author,
    ) -> GardenResult<IdeaOutcome> {
        let transition = self.lifecycle.discard(user_id, &idea_id, reason, author)?;
        let idea = transition.idea;
        self.emit(GardenEvent::Discarded {
            user_id: user_id.to_string(),
            idea_id: idea.id,
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_DISCARD_REASON)
                .to_string(),
            timestamp: idea.updated_at,
        });
        self.emit_evicted(user_id, transition.evicted);

        Ok(IdeaOutcome {
            idea,
            unlocked: self.unlock_after_commit(user_id),
        })
    }

    /// Fold `others` into `primary`. All or nothing.
    pub fn merge_ideas(
        &self,
        user_id: &str,
        primary: IdeaId,
        others: &[IdeaId],
        synthesis: &str,
        author: Author,
    ) -> GardenResult<IdeaOutcome> {
        let report = self
            .lifecycle
            .merge(user_id, &primary, others, synthesis, author)?;
        let absorbed: Vec<IdeaId> = report.absorbed.iter().map(|i| i.id).collect();
        self.emit(GardenEvent::Merged {
            user_id: user_id.to_string(),
            idea_id: report.primary.id,
            absorbed,
            timestamp: report.primary.updated_at,
        });
        self.emit_evicted(user_id, report.evicted);

        Ok(IdeaOutcome {
            idea: report.primary,
            unlocked: self.unlock_after_commit(user_id),
        })
    }

    /// All of a user's ideas by section, plus progression stats.
    pub fn overview(&self, user_id: &str) -> GardenResult<GardenOverview> {
        let mut overview = GardenOverview::default();
        for idea in self.store.list_ideas(user_id, &IdeaQuery::default())? {
            match idea.section {
                Section::Captured => overview.captured.push(idea),
                Section::Refining => overview.refining.push(idea),
                Section::Mature => overview.mature.push(idea),
                Section::Archive => overview.archived.push(idea),
            }
        }

        let profile = self.progression.profile(user_id)?;
        let unlocked_achievements = self
            .progression
            .unlocks(user_id)?
            .iter()
            .filter_map(|u| find_achievement(&u.achievement_key))
            .map(|a| a.name.to_string())
            .collect();

        overview.stats = GardenStats {
            total_active: overview.active().count(),
            total_refinements: overview.active().map(|i| u64::from(i.refinements)).sum(),
            total_finalized: profile.finalized,
            current_streak: profile.current_streak,
            longest_streak: profile.longest_streak,
            xp: profile.xp,
            level: profile.level,
            unlocked_achievements,
        };
        Ok(overview)
    }

    /// Groups of similar active ideas that could be merged.
    pub fn consolidation_suggestions(
        &self,
        user_id: &str,
    ) -> GardenResult<Vec<ConsolidationSuggestion>> {
        let overview = self.overview(user_id)?;
        let active: Vec<Idea> = overview.active().cloned().collect();
        let suggestions = consolidate(&active, self.config.similarity.consolidation_threshold);
        debug!(user_id, groups = suggestions.len(), "Computed consolidation suggestions");
        Ok(suggestions)
    }

    /// Active ideas similar to `text`, using the capture-time scan threshold.
    pub fn find_similar(&self, user_id: &str, text: &str) -> GardenResult<Vec<SimilarIdea>> {
        self.finder.find_similar(
            user_id,
            text,
            self.config.similarity.duplicate_scan_threshold,
        )
    }

    /// Look an idea up by id, or by case-insensitive title.
    pub fn idea_detail(&self, user_id: &str, identifier: &str) -> GardenResult<Option<IdeaDetail>> {
        let identifier = identifier.trim();
        let by_id = match Uuid::parse_str(identifier) {
            Ok(id) => self.store.get_idea(user_id, &id)?,
            Err(_) => None,
        };
        let idea = match by_id {
            Some(idea) => Some(idea),
            None => self.store.find_idea_by_title(user_id, identifier)?,
        };

        match idea {
            Some(idea) => {
                let logs = self.store.list_logs(&idea.id)?;
                Ok(Some(IdeaDetail { idea, logs }))
            }
            None => Ok(None),
        }
    }

    /// Unlock newly earned achievements. Returns their display names.
    pub fn check_achievements(&self, user_id: &str) -> GardenResult<Vec<String>> {
        self.unlock_achievements(user_id)
    }

    /// Record a visit and advance the daily streak.
    pub fn record_visit(&self, user_id: &str, today: NaiveDate) -> GardenResult<StreakUpdate> {
        let update = self.progression.record_visit(user_id, today)?;
        self.unlock_after_commit(user_id);
        Ok(update)
    }

    /// What the user should be reminded about at `now`.
    pub fn reminder_digest(&self, user_id: &str, now: DateTime<Utc>) -> GardenResult<ReminderDigest> {
        let active = self.store.list_ideas(user_id, &IdeaQuery::active())?;
        Ok(ReminderDigest::build(
            &active,
            now,
            Duration::days(self.config.reminders.stale_after_days),
        ))
    }

    pub fn profile(&self, user_id: &str) -> GardenResult<UserProfile> {
        self.progression.profile(user_id)
    }

    fn emit_evicted(&self, user_id: &str, evicted: Vec<IdeaId>) {
        if !evicted.is_empty() {
            self.emit(GardenEvent::Evicted {
                user_id: user_id.to_string(),
                idea_ids: evicted,
                timestamp: Utc::now(),
            });
        }
    }

    /// Achievement check following a committed transition. The transition
    /// already stands, so a failure here is logged rather than returned.
    fn unlock_after_commit(&self, user_id: &str) -> Vec<String> {
        match self.unlock_achievements(user_id) {
            Ok(names) => names,
            Err(e) => {
                warn!(user_id, error = %e, "Achievement check failed after commit");
                Vec::new()
            }
        }
    }

    fn unlock_achievements(&self, user_id: &str) -> GardenResult<Vec<String>> {
        let unlocked = self.progression.check_achievements(user_id)?;
        let now = Utc::now();
        for achievement in &unlocked {
            self.emit(GardenEvent::AchievementUnlocked {
                user_id: user_id.to_string(),
                achievement_key: achievement.key.to_string(),
                name: achievement.name.to_string(),
                xp_reward: achievement.xp_reward,
                timestamp: now,
            });
        }
        Ok(unlocked.iter().map(|a| a.name.to_string()).collect())
    }

    fn emit(&self, event: GardenEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}
