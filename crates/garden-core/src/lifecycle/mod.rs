//! Idea lifecycle: state transitions and the bounded archive.

mod archive;
mod engine;

pub use archive::ArchiveEvictor;
pub use engine::{
    next_section, LifecycleEngine, MergeReport, Transition, DEFAULT_DISCARD_REASON,
};
