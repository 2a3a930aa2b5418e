//! Persistence layer for ideas, refinement logs and user progression.

mod sqlite;

pub use sqlite::SqliteGardenStore;

use crate::error::GardenResult;
use crate::types::{
    AchievementUnlock, Idea, IdeaId, IdeaStatus, ProgressDelta, RefinementLogEntry, Section,
    UserProfile,
};

/// Filter for [`GardenStore::list_ideas`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaQuery {
    pub status: Option<IdeaStatus>,
    pub section: Option<Section>,
}

impl IdeaQuery {
    pub fn active() -> Self {
        Self {
            status: Some(IdeaStatus::Active),
            section: None,
        }
    }

    pub fn section(section: Section) -> Self {
        Self {
            status: None,
            section: Some(section),
        }
    }
}

/// A single idea write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum IdeaWrite {
    Insert(Idea),
    /// Replace the stored idea only if its revision still equals `expected_revision`.
    Update { idea: Idea, expected_revision: u64 },
}

/// Profile increment carried by a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChange {
    pub user_id: String,
    pub delta: ProgressDelta,
}

/// Archive limit enforced at the end of a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBound {
    pub user_id: String,
    pub capacity: usize,
}

/// Idea writes, log appends, the matching profile change and the archive
/// trim, committed in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub writes: Vec<IdeaWrite>,
    pub logs: Vec<RefinementLogEntry>,
    pub progress: Option<ProfileChange>,
    pub archive_bound: Option<ArchiveBound>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, idea: Idea) -> Self {
        self.writes.push(IdeaWrite::Insert(idea));
        self
    }

    /// Queue an update guarded by the revision the idea was read at.
    pub fn update(mut self, idea: Idea) -> Self {
        let expected_revision = idea.revision;
        self.writes.push(IdeaWrite::Update {
            idea,
            expected_revision,
        });
        self
    }

    pub fn log(mut self, entry: RefinementLogEntry) -> Self {
        self.logs.push(entry);
        self
    }

    /// Apply `delta` to the user's profile in the same transaction.
    pub fn progress(mut self, user_id: &str, delta: ProgressDelta) -> Self {
        self.progress = Some(ProfileChange {
            user_id: user_id.to_string(),
            delta,
        });
        self
    }

    /// After the writes, delete the user's archived ideas past `capacity`.
    pub fn bound_archive(mut self, user_id: &str, capacity: usize) -> Self {
        self.archive_bound = Some(ArchiveBound {
            user_id: user_id.to_string(),
            capacity,
        });
        self
    }
}

/// What a committed [`WriteBatch`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReceipt {
    /// Written ideas with their new revisions, in batch order.
    pub ideas: Vec<Idea>,
    /// Archived ideas deleted by the archive bound, newest first.
    pub evicted: Vec<IdeaId>,
    /// The profile after the change, when the batch carried a non-empty one.
    pub profile: Option<UserProfile>,
}

/// Storage backend for the garden.
///
/// Every idea lookup is scoped by owner: an idea belonging to another user
/// is indistinguishable from a missing one.
#[cfg_attr(test, mockall::automock)]
pub trait GardenStore: Send + Sync {
    /// Get an idea owned by `user_id`.
    fn get_idea(&self, user_id: &str, id: &IdeaId) -> GardenResult<Option<Idea>>;

    /// Case-insensitive exact title match; most recently updated wins.
    fn find_idea_by_title(&self, user_id: &str, title: &str) -> GardenResult<Option<Idea>>;

    /// List ideas most recently updated first, ties by write order (newest first).
    fn list_ideas(&self, user_id: &str, query: &IdeaQuery) -> GardenResult<Vec<Idea>>;

    /// Log entries of an idea, newest first.
    fn list_logs(&self, idea_id: &IdeaId) -> GardenResult<Vec<RefinementLogEntry>>;

    /// Apply a batch atomically.
    ///
    /// Fails with a conflict, and writes nothing, if any update's expected
    /// revision no longer matches. Any other failure, including the profile
    /// write or the archive trim, also leaves the store untouched.
    fn commit(&self, batch: WriteBatch) -> GardenResult<CommitReceipt>;

    /// Load a profile, creating an empty one on first access.
    fn load_profile(&self, user_id: &str) -> GardenResult<UserProfile>;

    /// Read-modify-write a profile in one transaction.
    fn apply_progress(&self, user_id: &str, delta: &ProgressDelta) -> GardenResult<UserProfile>;

    /// Record an unlock and award `xp_reward` in one transaction.
    ///
    /// Returns `None`, awarding nothing, if the pair already existed.
    fn record_unlock(
        &self,
        unlock: &AchievementUnlock,
        xp_reward: u64,
    ) -> GardenResult<Option<UserProfile>>;

    fn list_unlocks(&self, user_id: &str) -> GardenResult<Vec<AchievementUnlock>>;
}
