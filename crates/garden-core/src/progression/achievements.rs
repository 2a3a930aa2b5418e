//! Static achievement catalog.

use serde::Serialize;

use crate::types::UserStats;

/// An unlockable achievement.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AchievementDefinition {
    /// Stable identifier stored with unlocks.
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub xp_reward: u64,
    #[serde(skip)]
    pub predicate: fn(&UserStats) -> bool,
}

impl AchievementDefinition {
    pub fn is_satisfied(&self, stats: &UserStats) -> bool {
        (self.predicate)(stats)
    }
}

pub static ACHIEVEMENTS: [AchievementDefinition; 6] = [
    AchievementDefinition {
        key: "first-spark",
        name: "First Spark",
        description: "Captured your very first idea.",
        icon: "🌱",
        xp_reward: 50,
        predicate: |s| s.ideas_created >= 1,
    },
    AchievementDefinition {
        key: "dedicated-gardener",
        name: "Dedicated Gardener",
        description: "Refined ideas 10 times.",
        icon: "💧",
        xp_reward: 100,
        predicate: |s| s.refinements >= 10,
    },
    AchievementDefinition {
        key: "first-harvest",
        name: "First Harvest",
        description: "Finalized your first mature idea.",
        icon: "🌾",
        xp_reward: 200,
        predicate: |s| s.finalized >= 1,
    },
    AchievementDefinition {
        key: "idea-machine",
        name: "Idea Machine",
        description: "Had 5 active ideas growing at once.",
        icon: "🧠",
        xp_reward: 150,
        predicate: |s| s.active_ideas >= 5,
    },
    AchievementDefinition {
        key: "compost-master",
        name: "Compost Master",
        description: "Discarded an idea. Letting go is growth.",
        icon: "🍂",
        xp_reward: 30,
        predicate: |s| s.discarded >= 1,
    },
    AchievementDefinition {
        key: "week-streak",
        name: "Week Long Streak",
        description: "Visited the garden 7 days in a row.",
        icon: "🔥",
        xp_reward: 300,
        predicate: |s| s.current_streak >= 7,
    },
];

/// Look up a definition by key.
pub fn find_achievement(key: &str) -> Option<&'static AchievementDefinition> {
    ACHIEVEMENTS.iter().find(|a| a.key == key)
}
