//! Garden facade - the entry point adapters talk to.

mod main;
mod outcome;
mod reminders;

pub use main::Garden;
pub use outcome::{
    CreateOutcome, GardenOverview, GardenStats, IdeaDetail, IdeaOutcome, PlantOptions,
    RefineOutcome,
};
pub use reminders::ReminderDigest;
