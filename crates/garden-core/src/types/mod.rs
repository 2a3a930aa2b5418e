//! Core types for the garden.

mod idea;
mod progress;

pub use idea::{Author, Idea, IdeaId, IdeaStatus, LogKind, RefinementLogEntry, Section};
pub use progress::{AchievementUnlock, ProgressDelta, UserProfile, UserStats};
