//! Lookup and insight endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use garden_core::{ConsolidationSuggestion, IdeaDetail, SimilarIdea};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConsolidationResponse {
    pub suggestions: Vec<ConsolidationSuggestion>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub matches: Vec<SimilarIdea>,
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub ready_to_finalize: Vec<String>,
    pub needs_attention: Vec<String>,
    /// Rendered message, absent when there is nothing to remind about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AchievementCheckResponse {
    pub unlocked: Vec<String>,
}

/// Groups of similar active ideas worth merging.
/// GET /garden/consolidate
pub async fn consolidation_suggestions(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<ConsolidationResponse>> {
    let suggestions = state
        .with_garden(move |garden| garden.consolidation_suggestions(&user_id))
        .await?;

    Ok(Json(ConsolidationResponse { suggestions }))
}

/// Active ideas resembling free text.
/// GET /garden/similar?q=
pub async fn find_similar(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(query): Query<SimilarQuery>,
) -> ApiResult<Json<SimilarResponse>> {
    if query.q.trim().is_empty() {
        return Err(ApiError::validation("Query parameter 'q' must not be empty"));
    }

    let matches = state
        .with_garden(move |garden| garden.find_similar(&user_id, &query.q))
        .await?;

    Ok(Json(SimilarResponse { matches }))
}

/// Ideas ready to finalize or going stale.
/// GET /garden/reminders
pub async fn reminder_digest(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<ReminderResponse>> {
    let digest = state
        .with_garden(move |garden| garden.reminder_digest(&user_id, Utc::now()))
        .await?;

    let message = (!digest.is_empty()).then(|| digest.render());
    Ok(Json(ReminderResponse {
        ready_to_finalize: digest.ready_to_finalize,
        needs_attention: digest.needs_attention,
        message,
    }))
}

/// Unlock any newly earned achievements.
/// POST /garden/achievements/check
pub async fn check_achievements(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<AchievementCheckResponse>> {
    let unlocked = state
        .with_garden(move |garden| garden.check_achievements(&user_id))
        .await?;

    Ok(Json(AchievementCheckResponse { unlocked }))
}

/// Get an idea and its log by id or title.
/// GET /garden/:id
pub async fn get_idea(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(identifier): Path<String>,
) -> ApiResult<Json<IdeaDetail>> {
    let lookup = identifier.clone();
    let detail = state
        .with_garden(move |garden| garden.idea_detail(&user_id, &lookup))
        .await?;

    detail
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Idea '{}' not found", identifier)))
}
