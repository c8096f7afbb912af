//! API error type mapping the service taxonomy to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lullaby_engine::EngineError;
use lullaby_store::StoreError;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal server error: {0}")]
    InternalServerError(String),

    /// A typed service failure, mapped per-variant below.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Engine(EngineError::from(e))
    }
}

fn engine_status(e: &EngineError) -> StatusCode {
    match e {
        EngineError::Unauthenticated => StatusCode::UNAUTHORIZED,
        EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        // The caller has to store (or re-store) a provider key first.
        EngineError::MissingCredential(_) | EngineError::InvalidCredential => {
            StatusCode::PRECONDITION_FAILED
        }
        EngineError::DuplicateVoiceName(_) | EngineError::SynthesisInProgress => {
            StatusCode::CONFLICT
        }
        EngineError::GenerationFailed(_)
        | EngineError::SynthesisFailed(_)
        | EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
        EngineError::StorageFailed(_)
        | EngineError::SaveFailed(_)
        | EngineError::Database(_)
        | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "authentication required".to_string())
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ApiError::Engine(e) => (engine_status(e), e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lullaby_types::ProviderKind;

    fn status_of(e: EngineError) -> StatusCode {
        engine_status(&e)
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            status_of(EngineError::Unauthorized("story")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(EngineError::NotFound("story")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::DuplicateVoiceName("Grandma".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::SynthesisInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::SynthesisFailed("boom".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(EngineError::SaveFailed("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_credential_is_a_precondition_failure() {
        let err = EngineError::from(lullaby_store::StoreError::NotFound("user"));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        assert_eq!(
            status_of(EngineError::MissingCredential(
                lullaby_engine::ProviderKindLabel(ProviderKind::Speech)
            )),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            status_of(EngineError::InvalidCredential),
            StatusCode::PRECONDITION_FAILED
        );
    }
}
