//! Chat endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation to continue; one user may hold several.
    pub session_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Send one chat message.
/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let ChatRequest { session_id, text } = request;
    if session_id.trim().is_empty() {
        return Err(ApiError::validation("session_id must not be empty"));
    }

    let reply = state.chat_turn(&user_id, &session_id, text).await?;

    Ok(Json(ChatResponse { reply }))
}
