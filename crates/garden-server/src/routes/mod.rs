//! Route definitions for the REST API.

mod chat;
mod garden;
mod health;
mod ideas;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Lifecycle
        .route("/garden", get(garden::get_garden))
        .route("/garden/plant", post(garden::plant_idea))
        .route("/garden/water", post(garden::water_idea))
        .route("/garden/harvest", post(garden::harvest_idea))
        .route("/garden/compost", post(garden::compost_idea))
        .route("/garden/merge", post(garden::merge_ideas))
        // Lookups and insights
        .route("/garden/consolidate", get(ideas::consolidation_suggestions))
        .route("/garden/similar", get(ideas::find_similar))
        .route("/garden/reminders", get(ideas::reminder_digest))
        .route("/garden/achievements/check", post(ideas::check_achievements))
        .route("/garden/:id", get(ideas::get_idea))
        // Chat
        .route("/chat", post(chat::chat))
        // Attach state
        .with_state(state)
}

pub use chat::*;
pub use garden::*;
pub use health::*;
pub use ideas::*;
