//! garden-core - Core library for the idea garden.
//!
//! This crate provides the domain types, the keyword/similarity engine, the
//! idea lifecycle state machine, the bounded archive and the progression
//! (XP, levels, achievements) layer, composed behind the [`Garden`] facade.
//!
//! # Example
//!
//! ```ignore
//! use garden_core::{Author, Garden, GardenConfig, PlantOptions};
//!
//! let garden = Garden::in_memory(GardenConfig::default())?;
//!
//! // Capture an idea
//! let outcome = garden.create_idea("user1", "Plan a trip", "felt like it", PlantOptions::default())?;
//! let idea = outcome.idea.expect("not blocked");
//!
//! // Refine it
//! let refined = garden.refine_idea("user1", idea.id, "Maybe Lisbon in spring", Author::Human)?;
//! assert!(!refined.promoted);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod garden;
pub mod lifecycle;
pub mod progression;
pub mod similarity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{GardenConfig, LifecycleConfig, ReminderConfig, RewardConfig, SimilarityConfig};
pub use error::{ErrorCode, GardenError, GardenResult};
pub use events::{EventBus, EventSubscriber, GardenEvent};
pub use garden::{
    CreateOutcome, Garden, GardenOverview, GardenStats, IdeaDetail, IdeaOutcome, PlantOptions,
    RefineOutcome, ReminderDigest,
};
pub use progression::StreakUpdate;
pub use similarity::{
    extract_keywords, jaccard, ConsolidationSuggestion, DuplicateFinder, KeywordSet, SimilarIdea,
};
pub use store::{
    ArchiveBound, CommitReceipt, GardenStore, IdeaQuery, ProfileChange, SqliteGardenStore,
    WriteBatch,
};
pub use types::{
    AchievementUnlock, Author, Idea, IdeaId, IdeaStatus, LogKind, ProgressDelta,
    RefinementLogEntry, Section, UserProfile, UserStats,
};
