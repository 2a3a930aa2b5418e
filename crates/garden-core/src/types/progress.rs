//! User progression types: profile, deltas, unlocks and aggregate stats.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-user progression state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub xp: u64,
    /// Derived from `xp`, see [`UserProfile::level_for_xp`].
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
    /// Lifetime counters.
    pub ideas_created: u64,
    pub refinements: u64,
    pub finalized: u64,
    pub discarded: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            xp: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            last_visit: None,
            ideas_created: 0,
            refinements: 0,
            finalized: 0,
            discarded: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// `floor(sqrt(xp / 10)) + 1`
    pub fn level_for_xp(xp: u64) -> u32 {
        ((xp as f64 / 10.0).sqrt().floor() as u32).saturating_add(1)
    }

    /// Apply a delta in place. Pure; persistence is the store's job.
    pub fn apply(&mut self, delta: &ProgressDelta) {
        self.xp = self.xp.saturating_add(delta.xp);
        self.level = Self::level_for_xp(self.xp);
        self.ideas_created += delta.ideas_created;
        self.refinements += delta.refinements;
        self.finalized += delta.finalized;
        self.discarded += delta.discarded;

        if let Some(today) = delta.visit_on {
            self.current_streak = crate::progression::advance_streak(
                self.last_visit,
                self.current_streak,
                today,
            );
            self.longest_streak = self.longest_streak.max(self.current_streak);
            if self.last_visit.map_or(true, |last| today > last) {
                self.last_visit = Some(today);
            }
        }

        self.updated_at = Utc::now();
    }
}

/// Increment applied atomically to a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressDelta {
    pub xp: u64,
    pub ideas_created: u64,
    pub refinements: u64,
    pub finalized: u64,
    pub discarded: u64,
    pub visit_on: Option<NaiveDate>,
}

impl ProgressDelta {
    pub fn xp(amount: u64) -> Self {
        Self {
            xp: amount,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A recorded achievement for a user. Unique per (user, key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub user_id: String,
    pub achievement_key: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Aggregate statistics evaluated by achievement predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub ideas_created: u64,
    pub refinements: u64,
    pub finalized: u64,
    pub discarded: u64,
    pub active_ideas: u64,
    pub current_streak: u32,
}
