//! garden-server - REST API server for the idea garden.
//!
//! Exposes the [`garden_core::Garden`] facade over HTTP, plus a small
//! command-driven chat endpoint that keeps per-session conversation state.
//!
//! # Example
//!
//! ```ignore
//! use garden_core::GardenConfig;
//! use garden_server::{create_server, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::in_memory(GardenConfig::default()).unwrap();
//!     let app = create_server(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod conversation;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

pub use conversation::ConversationState;
pub use error::{ApiError, ApiResult};
pub use extract::UserId;
pub use state::AppState;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
