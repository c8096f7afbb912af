//! Provider credential endpoints.
//!
//! Keys are accepted over PUT, encrypted by the engine, and never echoed
//! back; the status endpoint reports booleans only.

use axum::{extract::Extension, response::Json};
use lullaby_types::{CredentialStatus, ProviderKind};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::AuthContext;
use crate::{ApiError, AppState};

/// Upper bound on an API key; anything longer is garbage input.
const MAX_API_KEY_LEN: usize = 512;

#[derive(Debug, Deserialize)]
pub struct StoreCredentialRequest {
    pub api_key: String,
}

/// GET /api/me/credentials
pub async fn credential_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
) -> Result<Json<CredentialStatus>, ApiError> {
    let status = state.engine.credential_status(&ctx).await?;
    Ok(Json(status))
}

async fn store_credential(
    state: Arc<AppState>,
    ctx: lullaby_types::UserContext,
    kind: ProviderKind,
    payload: StoreCredentialRequest,
) -> Result<Json<Value>, ApiError> {
    let api_key = payload.api_key.trim();
    if api_key.is_empty() || api_key.len() > MAX_API_KEY_LEN {
        return Err(ApiError::BadRequest("invalid API key".to_string()));
    }

    state.engine.store_credential(&ctx, kind, api_key).await?;
    Ok(Json(json!({"status": "ok"})))
}

/// PUT /api/me/credentials/text
pub async fn store_text_credential_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Json(payload): Json<StoreCredentialRequest>,
) -> Result<Json<Value>, ApiError> {
    store_credential(state, ctx, ProviderKind::Text, payload).await
}

/// PUT /api/me/credentials/speech
pub async fn store_speech_credential_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(ctx)): Extension<AuthContext>,
    Json(payload): Json<StoreCredentialRequest>,
) -> Result<Json<Value>, ApiError> {
    store_credential(state, ctx, ProviderKind::Speech, payload).await
}
