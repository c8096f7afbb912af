//! Child profile CRUD handlers.

use axum::{
    extract::{Extension, Path},
    response::Json,
};
use lullaby_store::{ChildProfileUpdate, NewChildProfile};
use lullaby_types::ChildProfile;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::AuthContext;
use crate::{ApiError, AppState};

/// Maximum length for a child's name.
const MAX_NAME_LEN: usize = 100;
/// Maximum length for the interests text.
const MAX_INTERESTS_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub name: String,
    pub age: i64,
    pub interests: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub interests: Option<String>,
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest("invalid child name".to_string()));
    }
    Ok(())
}

fn validate_age(age: i64) -> Result<(), ApiError> {
    if !(1..=17).contains(&age) {
        return Err(ApiError::BadRequest(
            "age must be between 1 and 17".to_string(),
        ));
    }
    Ok(())
}

fn validate_interests(interests: &str) -> Result<(), ApiError> {
    if interests.len() > MAX_INTERESTS_LEN {
        return Err(ApiError::BadRequest("interests text too long".to_string()));
    }
    Ok(())
}

/// POST /api/children
pub async fn create_child_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Json(payload): Json<CreateChildRequest>,
) -> Result<Json<ChildProfile>, ApiError> {
    validate_name(&payload.name)?;
    validate_age(payload.age)?;
    validate_interests(&payload.interests)?;

    let profile = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::create_child_profile(
            &conn,
            &ctx.user_id,
            &NewChildProfile {
                name: payload.name.trim().to_string(),
                age: payload.age,
                interests: payload.interests,
            },
        )
        .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(profile))
}

/// GET /api/children
pub async fn list_children_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
) -> Result<Json<Vec<ChildProfile>>, ApiError> {
    let profiles = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::list_child_profiles(&conn, &ctx.user_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(profiles))
}

/// GET /api/children/:childId
pub async fn get_child_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(child_id): Path<String>,
) -> Result<Json<ChildProfile>, ApiError> {
    let profile = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::get_child_profile(&conn, &ctx.user_id, &child_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??
    .ok_or_else(|| ApiError::NotFound("child profile not found".to_string()))?;

    Ok(Json(profile))
}

/// PATCH /api/children/:childId
pub async fn update_child_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(child_id): Path<String>,
    Json(payload): Json<UpdateChildRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(ref name) = payload.name {
        validate_name(name)?;
    }
    if let Some(age) = payload.age {
        validate_age(age)?;
    }
    if let Some(ref interests) = payload.interests {
        validate_interests(interests)?;
    }

    tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::update_child_profile(
            &conn,
            &ctx.user_id,
            &child_id,
            &ChildProfileUpdate {
                name: payload.name.map(|n| n.trim().to_string()),
                age: payload.age,
                interests: payload.interests,
            },
        )
        .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(json!({"status": "ok"})))
}

/// DELETE /api/children/:childId
pub async fn delete_child_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Path(child_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        lullaby_store::delete_child_profile(&conn, &ctx.user_id, &child_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    Ok(Json(json!({"status": "deleted"})))
}
