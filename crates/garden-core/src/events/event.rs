//! Garden change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IdeaId, Section};

/// Emitted on the event bus after a garden mutation has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GardenEvent {
    Planted {
        user_id: String,
        idea_id: IdeaId,
        title: String,
        timestamp: DateTime<Utc>,
    },
    Refined {
        user_id: String,
        idea_id: IdeaId,
        refinements: u32,
        section: Section,
        /// True only on the refinement that crossed a threshold.
        promoted: bool,
        timestamp: DateTime<Utc>,
    },
    Finalized {
        user_id: String,
        idea_id: IdeaId,
        timestamp: DateTime<Utc>,
    },
    Discarded {
        user_id: String,
        idea_id: IdeaId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    Merged {
        user_id: String,
        /// The surviving idea.
        idea_id: IdeaId,
        absorbed: Vec<IdeaId>,
        timestamp: DateTime<Utc>,
    },
    /// Archived ideas physically removed to keep the archive bounded.
    Evicted {
        user_id: String,
        idea_ids: Vec<IdeaId>,
        timestamp: DateTime<Utc>,
    },
    AchievementUnlocked {
        user_id: String,
        achievement_key: String,
        name: String,
        xp_reward: u64,
        timestamp: DateTime<Utc>,
    },
}

impl GardenEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Planted { .. } => "idea.planted",
            Self::Refined { .. } => "idea.refined",
            Self::Finalized { .. } => "idea.finalized",
            Self::Discarded { .. } => "idea.discarded",
            Self::Merged { .. } => "idea.merged",
            Self::Evicted { .. } => "archive.evicted",
            Self::AchievementUnlocked { .. } => "achievement.unlocked",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::Planted { user_id, .. }
            | Self::Refined { user_id, .. }
            | Self::Finalized { user_id, .. }
            | Self::Discarded { user_id, .. }
            | Self::Merged { user_id, .. }
            | Self::Evicted { user_id, .. }
            | Self::AchievementUnlocked { user_id, .. } => user_id,
        }
    }

    /// The idea this event is about, if it concerns a single idea.
    pub fn idea_id(&self) -> Option<IdeaId> {
        match self {
            Self::Planted { idea_id, .. }
            | Self::Refined { idea_id, .. }
            | Self::Finalized { idea_id, .. }
            | Self::Discarded { idea_id, .. }
            | Self::Merged { idea_id, .. } => Some(*idea_id),
            Self::Evicted { .. } | Self::AchievementUnlocked { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Planted { timestamp, .. }
            | Self::Refined { timestamp, .. }
            | Self::Finalized { timestamp, .. }
            | Self::Discarded { timestamp, .. }
            | Self::Merged { timestamp, .. }
            | Self::Evicted { timestamp, .. }
            | Self::AchievementUnlocked { timestamp, .. } => *timestamp,
        }
    }
}
