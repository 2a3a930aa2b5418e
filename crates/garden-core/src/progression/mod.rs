//! Progression layer: XP rewards, levels, daily streaks and achievements.

mod achievements;
mod engine;
mod streak;

pub use achievements::{find_achievement, AchievementDefinition, ACHIEVEMENTS};
pub use engine::{ProgressEvent, ProgressionEngine, StreakUpdate};
pub use streak::advance_streak;
