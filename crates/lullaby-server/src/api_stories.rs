//! Story handlers: queries, favorites, and the generation pipeline entry
//! points (ideas, story text, narration audio).

use axum::{
    extract::{Extension, Path},
    response::Json,
};
use lullaby_blobs::BlobRef;
use lullaby_types::inputs::{ChildSelector, StoryIdea, VoiceSelector};
use lullaby_types::Story;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::AuthContext;
use crate::{ApiError, AppState};

/// A story plus the resolved URL of its narration, when one exists.
#[derive(Debug, Serialize)]
pub struct StoryView {
    #[serde(flatten)]
    pub story: Story,
    pub audio_url: Option<String>,
}

async fn story_view(state: &AppState, story: Story) -> StoryView {
    let audio_url = match &story.audio_blob {
        Some(blob) => state.engine.blobs().url(&BlobRef::new(blob.clone())).await,
        None => None,
    };
    StoryView { story, audio_url }
}

async fn story_views(state: &AppState, stories: Vec<Story>) -> Vec<StoryView> {
    let mut views = Vec::with_capacity(stories.len());
    for story in stories {
        views.push(story_view(state, story).await);
    }
    views
}

#[derive(Debug, Deserialize)]
pub struct GenerateIdeasRequest {
    pub child: ChildSelector,
}

#[derive(Debug, Deserialize)]
pub struct GenerateStoryRequest {
    pub idea: StoryIdea,
    pub child: ChildSelector,
    pub voice: VoiceSelector,
}

/// POST /api/ideas
pub async fn generate_ideas_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Json(payload): Json<GenerateIdeasRequest>,
) -> Result<Json<Vec<StoryIdea>>, ApiError> {
    let ideas = state
        .engine
        .generate_story_ideas(&ctx, &payload.child)
        .await?;
    Ok(Json(ideas))
}

/// POST /api/stories
///
/// Expands a chosen idea into full story text; the new story comes back in
/// `pending` audio status.
pub async fn generate_story_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Json(payload): Json<GenerateStoryRequest>,
) -> Result<Json<StoryView>, ApiError> {
    if payload.idea.title.trim().is_empty() {
        return Err(ApiError::BadRequest("idea title is required".to_string()));
    }

    let story = state
        .engine
        .generate_story(&ctx, &payload.idea, &payload.child, &payload.voice)
        .await?;
    Ok(Json(story_view(&state, story).await))
}

/// POST /api/stories/:storyId/audio
///
/// Kicks the synthesis pipeline for a story. Polling `GET /api/stories/:id`
/// observes `generating` while the provider call is in flight.
pub async fn synthesize_audio_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(story_id): Path<String>,
) -> Result<Json<StoryView>, ApiError> {
    let story = state.engine.synthesize_story_audio(&ctx, &story_id).await?;
    Ok(Json(story_view(&state, story).await))
}

/// GET /api/stories
pub async fn list_stories_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
) -> Result<Json<Vec<StoryView>>, ApiError> {
    let state_clone = state.clone();
    let stories = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::list_stories(&conn, &ctx.user_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(story_views(&state, stories).await))
}

/// GET /api/stories/favorites
pub async fn list_favorites_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
) -> Result<Json<Vec<StoryView>>, ApiError> {
    let state_clone = state.clone();
    let stories = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::list_favorite_stories(&conn, &ctx.user_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(story_views(&state, stories).await))
}

/// GET /api/stories/:storyId
pub async fn get_story_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(story_id): Path<String>,
) -> Result<Json<StoryView>, ApiError> {
    let state_clone = state.clone();
    let story = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::get_story(&conn, &ctx.user_id, &story_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??
    .ok_or_else(|| ApiError::NotFound("story not found".to_string()))?;

    Ok(Json(story_view(&state, story).await))
}

/// GET /api/children/:childId/stories
pub async fn stories_for_child_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(child_id): Path<String>,
) -> Result<Json<Vec<StoryView>>, ApiError> {
    let state_clone = state.clone();
    let stories = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::list_stories_for_child(&conn, &ctx.user_id, &child_id)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(story_views(&state, stories).await))
}

/// POST /api/stories/:storyId/favorite
pub async fn toggle_favorite_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(story_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let is_favorite = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::toggle_favorite(&conn, &ctx.user_id, &story_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(json!({"is_favorite": is_favorite})))
}
