//! In-process pub/sub for garden changes.

mod bus;
mod event;

pub use bus::{EventBus, EventSubscriber};
pub use event::GardenEvent;
