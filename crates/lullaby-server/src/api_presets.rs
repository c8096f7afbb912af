//! Voice preset handlers.
//!
//! Creation goes through the provisioning pipeline in the engine (sample
//! synthesis, provider voice registration, blob storage); PATCH only
//! renames the local row, and the provider-side voice keeps its name.

use axum::{
    extract::{Extension, Path},
    response::Json,
};
use lullaby_blobs::BlobRef;
use lullaby_store::VoicePresetUpdate;
use lullaby_types::VoicePreset;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::AuthContext;
use crate::{ApiError, AppState};

/// Maximum length for a preset name.
const MAX_PRESET_NAME_LEN: usize = 80;
/// Maximum length for a voice description.
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct CreatePresetRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePresetRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A preset plus the resolved URL of its stored sample narration.
#[derive(Debug, Serialize)]
pub struct PresetView {
    #[serde(flatten)]
    pub preset: VoicePreset,
    pub sample_audio_url: Option<String>,
}

async fn preset_view(state: &AppState, preset: VoicePreset) -> PresetView {
    let sample_audio_url = state
        .engine
        .blobs()
        .url(&BlobRef::new(preset.sample_blob.clone()))
        .await;
    PresetView {
        preset,
        sample_audio_url,
    }
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() || name.len() > MAX_PRESET_NAME_LEN {
        return Err(ApiError::BadRequest("invalid preset name".to_string()));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.trim().is_empty() || description.len() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::BadRequest(
            "invalid voice description".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/presets
pub async fn list_presets_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
) -> Result<Json<Vec<PresetView>>, ApiError> {
    let state_clone = state.clone();
    let presets = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::list_voice_presets(&conn, &ctx.user_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    let mut views = Vec::with_capacity(presets.len());
    for preset in presets {
        views.push(preset_view(&state, preset).await);
    }
    Ok(Json(views))
}

/// GET /api/presets/:presetId
pub async fn get_preset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(preset_id): Path<String>,
) -> Result<Json<PresetView>, ApiError> {
    let state_clone = state.clone();
    let preset = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::get_voice_preset(&conn, &ctx.user_id, &preset_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??
    .ok_or_else(|| ApiError::NotFound("voice preset not found".to_string()))?;

    Ok(Json(preset_view(&state, preset).await))
}

/// POST /api/presets
///
/// Runs the full provisioning pipeline; duplicate names surface as 409.
pub async fn create_preset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Json(payload): Json<CreatePresetRequest>,
) -> Result<Json<PresetView>, ApiError> {
    validate_name(&payload.name)?;
    validate_description(&payload.description)?;

    let preset = state
        .engine
        .create_voice_preset(&ctx, payload.name.trim(), payload.description.trim())
        .await?;

    Ok(Json(preset_view(&state, preset).await))
}

/// PATCH /api/presets/:presetId
pub async fn update_preset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(preset_id): Path<String>,
    Json(payload): Json<UpdatePresetRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(ref name) = payload.name {
        validate_name(name)?;
    }
    if let Some(ref description) = payload.description {
        validate_description(description)?;
    }

    tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::update_voice_preset(
            &conn,
            &ctx.user_id,
            &preset_id,
            &VoicePresetUpdate {
                name: payload.name.map(|n| n.trim().to_string()),
                description: payload.description.map(|d| d.trim().to_string()),
            },
        )
        .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(json!({"status": "ok"})))
}

/// DELETE /api/presets/:presetId
pub async fn delete_preset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(preset_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.engine.delete_voice_preset(&ctx, &preset_id).await?;
    Ok(Json(json!({"status": "deleted"})))
}
