//! XP, levels, visit streaks and achievement unlocking.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::achievements::{AchievementDefinition, ACHIEVEMENTS};
use crate::config::RewardConfig;
use crate::error::GardenResult;
use crate::store::{GardenStore, IdeaQuery};
use crate::types::{AchievementUnlock, ProgressDelta, UserProfile, UserStats};

/// A lifecycle event that feeds the progression layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Created,
    Refined,
    Finalized,
    Discarded,
    /// A merge counts as one refinement of the primary; absorbed ideas
    /// count as discarded.
    Merged { absorbed: u64 },
}

impl ProgressEvent {
    /// XP reward and lifetime counters earned by the event.
    pub fn delta(self, rewards: &RewardConfig) -> ProgressDelta {
        match self {
            ProgressEvent::Created => ProgressDelta {
                xp: rewards.create_xp,
                ideas_created: 1,
                ..Default::default()
            },
            ProgressEvent::Refined => ProgressDelta {
                xp: rewards.refine_xp,
                refinements: 1,
                ..Default::default()
            },
            ProgressEvent::Finalized => ProgressDelta {
                xp: rewards.finalize_xp,
                finalized: 1,
                ..Default::default()
            },
            ProgressEvent::Discarded => ProgressDelta {
                discarded: 1,
                ..Default::default()
            },
            ProgressEvent::Merged { absorbed } => ProgressDelta {
                refinements: 1,
                discarded: absorbed,
                ..Default::default()
            },
        }
    }
}

/// Streak state after recording a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// False when the user had already visited on this date.
    pub first_visit_today: bool,
}

pub struct ProgressionEngine {
    store: Arc<dyn GardenStore>,
    rewards: RewardConfig,
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn GardenStore>, rewards: RewardConfig) -> Self {
        Self { store, rewards }
    }

    /// Add XP and recompute the level atomically.
    pub fn award(&self, user_id: &str, amount: u64) -> GardenResult<UserProfile> {
        let profile = self.store.apply_progress(user_id, &ProgressDelta::xp(amount))?;
        debug!(user_id, amount, xp = profile.xp, level = profile.level, "XP awarded");
        Ok(profile)
    }

    /// Record a visit on `today` and advance the daily streak.
    pub fn record_visit(&self, user_id: &str, today: NaiveDate) -> GardenResult<StreakUpdate> {
        let before = self.store.load_profile(user_id)?;
        let profile = self.store.apply_progress(
            user_id,
            &ProgressDelta {
                visit_on: Some(today),
                ..Default::default()
            },
        )?;

        Ok(StreakUpdate {
            current_streak: profile.current_streak,
            longest_streak: profile.longest_streak,
            first_visit_today: before.last_visit != Some(today),
        })
    }

    pub fn profile(&self, user_id: &str) -> GardenResult<UserProfile> {
        self.store.load_profile(user_id)
    }

    /// Aggregate statistics used by achievement predicates.
    pub fn stats(&self, user_id: &str) -> GardenResult<UserStats> {
        let profile = self.store.load_profile(user_id)?;
        let active = self.store.list_ideas(user_id, &IdeaQuery::active())?;

        Ok(UserStats {
            ideas_created: profile.ideas_created,
            refinements: profile.refinements,
            finalized: profile.finalized,
            discarded: profile.discarded,
            active_ideas: active.len() as u64,
            current_streak: profile.current_streak,
        })
    }

    pub fn unlocks(&self, user_id: &str) -> GardenResult<Vec<AchievementUnlock>> {
        self.store.list_unlocks(user_id)
    }

    /// Unlock every newly satisfied achievement and award its XP.
    ///
    /// Idempotent: an achievement already recorded is never awarded again,
    /// even when two checks race. Each unlock and its award commit together.
    pub fn check_achievements(
        &self,
        user_id: &str,
    ) -> GardenResult<Vec<&'static AchievementDefinition>> {
        let stats = self.stats(user_id)?;
        let existing: HashSet<String> = self
            .store
            .list_unlocks(user_id)?
            .into_iter()
            .map(|u| u.achievement_key)
            .collect();

        let mut unlocked = Vec::new();
        for achievement in ACHIEVEMENTS.iter() {
            if existing.contains(achievement.key) || !achievement.is_satisfied(&stats) {
                continue;
            }

            let unlock = AchievementUnlock {
                user_id: user_id.to_string(),
                achievement_key: achievement.key.to_string(),
                unlocked_at: Utc::now(),
            };
            let Some(profile) = self.store.record_unlock(&unlock, achievement.xp_reward)? else {
                continue;
            };

            info!(
                user_id,
                achievement = achievement.key,
                xp = achievement.xp_reward,
                level = profile.level,
                "Achievement unlocked"
            );
            unlocked.push(achievement);
        }

        Ok(unlocked)
    }
}
