//! Auth bootstrap.
//!
//! Registration is the only unauthenticated mutation: it creates the user
//! row and hands back the bearer token every other route requires. There
//! is no password flow here; the token is the credential, issued once.

use axum::{extract::Extension, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Maximum length for an email address.
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
    /// Bearer token for the Authorization header.
    pub auth_token: String,
}

/// POST /api/auth/register
pub async fn register_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    let user = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;

        lullaby_store::create_user(&conn, &email).map_err(|e| {
            // Unique-constraint violation on email -> 409 Conflict
            if let lullaby_store::StoreError::Database(rusqlite::Error::SqliteFailure(
                error_code,
                _,
            )) = e
            {
                if error_code.code == rusqlite::ffi::ErrorCode::ConstraintViolation {
                    return ApiError::Conflict("an account with this email exists".to_string());
                }
            }
            ApiError::from(e)
        })
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    tracing::info!(user = %user.id, "registered user");

    Ok(Json(RegisterResponse {
        user_id: user.id,
        email: user.email,
        auth_token: user.auth_token,
    }))
}
