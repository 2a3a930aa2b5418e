//! Idea and refinement log types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Identifier of an idea.
pub type IdeaId = Uuid;

/// Terminal or non-terminal lifecycle status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdeaStatus {
    Active,
    Finalized,
    Discarded,
}

/// Where an idea currently sits in the garden.
///
/// The three active sections are ordered by maturity; `Archive` holds every
/// finalized or discarded idea.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    Captured,
    Refining,
    Mature,
    Archive,
}

/// Who wrote a capture or log entry.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Author {
    #[default]
    Human,
    Automated,
}

/// Kind of a refinement log entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    Refinement,
    Finalize,
    Discard,
    Merge,
}

/// A tracked idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub user_id: String,
    pub title: String,
    /// Why the idea was captured.
    pub origin: String,
    /// Number of refinements received. Never decreases while active.
    pub refinements: u32,
    pub status: IdeaStatus,
    pub section: Section,
    pub author: Author,
    /// Set when this idea was absorbed by a merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<IdeaId>,
    /// Optimistic concurrency counter, bumped by every stored update.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Idea {
    /// Create a freshly captured idea. Inputs are trimmed.
    pub fn new(
        user_id: impl Into<String>,
        title: &str,
        origin: &str,
        author: Author,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.trim().to_string(),
            origin: origin.trim().to_string(),
            refinements: 0,
            status: IdeaStatus::Active,
            section: Section::Captured,
            author,
            merged_into: None,
            revision: 0,
            created_at: now,
            updated_at: now,
            finalized_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == IdeaStatus::Active
    }

    pub fn is_archived(&self) -> bool {
        self.section == Section::Archive
    }

    /// Move the idea into the archive with a terminal status.
    pub(crate) fn archive(&mut self, status: IdeaStatus, at: DateTime<Utc>) {
        debug_assert!(status != IdeaStatus::Active);
        self.status = status;
        self.section = Section::Archive;
        self.updated_at = at;
        if status == IdeaStatus::Finalized {
            self.finalized_at = Some(at);
        }
    }
}

/// Append-only history entry attached to an idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementLogEntry {
    pub id: Uuid,
    pub idea_id: IdeaId,
    pub content: String,
    pub author: Author,
    pub kind: LogKind,
    pub created_at: DateTime<Utc>,
}

impl RefinementLogEntry {
    pub fn new(idea_id: IdeaId, content: impl Into<String>, author: Author, kind: LogKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            idea_id,
            content: content.into(),
            author,
            kind,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_idea_is_captured() {
        let idea = Idea::new("user1", "  Plan a trip ", " felt like it ", Author::Human);
        assert_eq!(idea.title, "Plan a trip");
        assert_eq!(idea.origin, "felt like it");
        assert_eq!(idea.refinements, 0);
        assert_eq!(idea.section, Section::Captured);
        assert!(idea.is_active());
        assert!(!idea.is_archived());
    }

    #[test]
    fn test_archive_sets_finalized_at_only_when_finalized() {
        let mut finalized = Idea::new("u", "a", "b", Author::Human);
        let now = Utc::now();
        finalized.archive(IdeaStatus::Finalized, now);
        assert_eq!(finalized.finalized_at, Some(now));
        assert!(finalized.is_archived());

        let mut discarded = Idea::new("u", "a", "b", Author::Human);
        discarded.archive(IdeaStatus::Discarded, now);
        assert!(discarded.finalized_at.is_none());
        assert_eq!(discarded.section, Section::Archive);
    }

    #[test]
    fn test_enum_string_forms() {
        assert_eq!(Section::Refining.to_string(), "REFINING");
        assert_eq!(IdeaStatus::from_str("DISCARDED").unwrap(), IdeaStatus::Discarded);
        assert_eq!(Author::from_str("AUTOMATED").unwrap(), Author::Automated);
        assert_eq!(
            serde_json::to_string(&LogKind::Merge).unwrap(),
            "\"MERGE\""
        );
    }

    #[test]
    fn test_section_ordering_follows_maturity() {
        assert!(Section::Captured < Section::Refining);
        assert!(Section::Refining < Section::Mature);
    }
}
