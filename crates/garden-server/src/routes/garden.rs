//! Lifecycle endpoints: overview, capture, refine, finalize, discard, merge.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use garden_core::{
    Author, CreateOutcome, GardenOverview, IdeaId, IdeaOutcome, PlantOptions, RefineOutcome,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::UserId;
use crate::state::AppState;

/// Request body for capturing an idea.
#[derive(Debug, Deserialize)]
pub struct PlantRequest {
    pub title: String,
    /// Why the idea came up.
    pub origin: String,
    /// Capture even when a near-duplicate exists.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub author: Author,
}

#[derive(Debug, Deserialize)]
pub struct WaterRequest {
    pub idea_id: IdeaId,
    pub content: String,
    #[serde(default)]
    pub author: Author,
}

#[derive(Debug, Deserialize)]
pub struct HarvestRequest {
    pub idea_id: IdeaId,
    #[serde(default)]
    pub author: Author,
}

#[derive(Debug, Deserialize)]
pub struct CompostRequest {
    pub idea_id: IdeaId,
    pub reason: Option<String>,
    #[serde(default)]
    pub author: Author,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub primary_id: IdeaId,
    pub other_ids: Vec<IdeaId>,
    pub synthesis: String,
    #[serde(default)]
    pub author: Author,
}

/// View the garden. Counts as a visit for today's streak.
/// GET /garden
pub async fn get_garden(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<GardenOverview>> {
    let overview = state
        .with_garden(move |garden| {
            let streak = garden.record_visit(&user_id, Utc::now().date_naive())?;
            debug!(
                user_id = %user_id,
                current_streak = streak.current_streak,
                "Visit recorded"
            );
            garden.overview(&user_id)
        })
        .await?;

    Ok(Json(overview))
}

/// Capture an idea.
/// POST /garden/plant
pub async fn plant_idea(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<PlantRequest>,
) -> ApiResult<(StatusCode, Json<CreateOutcome>)> {
    let options = PlantOptions {
        author: request.author,
        force: request.force,
    };
    let outcome = state
        .with_garden(move |garden| {
            garden.create_idea(&user_id, &request.title, &request.origin, options)
        })
        .await?;

    if outcome.blocked {
        return Err(
            ApiError::conflict("A very similar idea already exists").with_details(json!({
                "blocked": true,
                "similar_matches": outcome.similar_matches,
            })),
        );
    }

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Add a refinement to an idea.
/// POST /garden/water
pub async fn water_idea(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<WaterRequest>,
) -> ApiResult<Json<RefineOutcome>> {
    let outcome = state
        .with_garden(move |garden| {
            garden.refine_idea(&user_id, request.idea_id, &request.content, request.author)
        })
        .await?;

    Ok(Json(outcome))
}

/// Finalize a mature idea.
/// POST /garden/harvest
pub async fn harvest_idea(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<HarvestRequest>,
) -> ApiResult<Json<IdeaOutcome>> {
    let outcome = state
        .with_garden(move |garden| {
            garden.finalize_idea(&user_id, request.idea_id, request.author)
        })
        .await?;

    Ok(Json(outcome))
}

/// Discard an idea.
/// POST /garden/compost
pub async fn compost_idea(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<CompostRequest>,
) -> ApiResult<Json<IdeaOutcome>> {
    let outcome = state
        .with_garden(move |garden| {
            garden.discard_idea(
                &user_id,
                request.idea_id,
                request.reason.as_deref(),
                request.author,
            )
        })
        .await?;

    Ok(Json(outcome))
}

/// Fold other ideas into a primary one.
/// POST /garden/merge
pub async fn merge_ideas(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<MergeRequest>,
) -> ApiResult<Json<IdeaOutcome>> {
    let outcome = state
        .with_garden(move |garden| {
            garden.merge_ideas(
                &user_id,
                request.primary_id,
                &request.other_ids,
                &request.synthesis,
                request.author,
            )
        })
        .await?;

    Ok(Json(outcome))
}
