//! Results returned by the [`Garden`](super::Garden) facade.

use serde::{Deserialize, Serialize};

use crate::similarity::SimilarIdea;
use crate::types::{Author, Idea, RefinementLogEntry, Section};

/// Options for capturing an idea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantOptions {
    #[serde(default)]
    pub author: Author,
    /// Capture even when a near-duplicate exists.
    #[serde(default)]
    pub force: bool,
}

impl PlantOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOutcome {
    /// `None` when the capture was blocked.
    pub idea: Option<Idea>,
    /// Existing active ideas above the scan threshold, best first.
    pub similar_matches: Vec<SimilarIdea>,
    pub blocked: bool,
    /// Display names of achievements unlocked by this call.
    pub unlocked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineOutcome {
    pub idea: Idea,
    pub promoted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_section: Option<Section>,
    pub unlocked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaOutcome {
    pub idea: Idea,
    pub unlocked: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GardenStats {
    pub total_active: usize,
    /// Sum of refinements over active ideas.
    pub total_refinements: u64,
    /// Lifetime count, unaffected by archive eviction.
    pub total_finalized: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub xp: u64,
    pub level: u32,
    pub unlocked_achievements: Vec<String>,
}

/// A user's ideas grouped by section, each most recently updated first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GardenOverview {
    pub captured: Vec<Idea>,
    pub refining: Vec<Idea>,
    pub mature: Vec<Idea>,
    pub archived: Vec<Idea>,
    pub stats: GardenStats,
}

impl GardenOverview {
    /// Active ideas in display order.
    pub fn active(&self) -> impl Iterator<Item = &Idea> {
        self.captured
            .iter()
            .chain(self.refining.iter())
            .chain(self.mature.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaDetail {
    pub idea: Idea,
    /// Newest first.
    pub logs: Vec<RefinementLogEntry>,
}
