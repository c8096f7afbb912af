//! Lullaby server library logic.
//!
//! Wires the generation engine and the store behind an axum JSON API. The
//! UI talks only to these routes; everything under `/api` except auth
//! bootstrap runs behind the bearer-token middleware, which resolves the
//! caller into an explicit [`lullaby_types::UserContext`].

pub mod api_auth;
pub mod api_children;
pub mod api_credentials;
pub mod api_presets;
pub mod api_stories;
pub mod config;
pub mod error;
pub mod middleware;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Extension, Json, Router,
};
use lullaby_db::DbPool;
use lullaby_engine::Engine;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub use error::ApiError;

/// Maximum request body size (1 MiB). The API carries JSON only; audio
/// flows out through `/media`, never in.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// The generation services.
    pub engine: Arc<Engine>,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/me/credentials",
            get(api_credentials::credential_status_handler),
        )
        .route(
            "/api/me/credentials/text",
            put(api_credentials::store_text_credential_handler),
        )
        .route(
            "/api/me/credentials/speech",
            put(api_credentials::store_speech_credential_handler),
        )
        .route(
            "/api/children",
            post(api_children::create_child_handler).get(api_children::list_children_handler),
        )
        .route(
            "/api/children/{childId}",
            get(api_children::get_child_handler)
                .patch(api_children::update_child_handler)
                .delete(api_children::delete_child_handler),
        )
        .route(
            "/api/children/{childId}/stories",
            get(api_stories::stories_for_child_handler),
        )
        .route(
            "/api/presets",
            get(api_presets::list_presets_handler).post(api_presets::create_preset_handler),
        )
        .route(
            "/api/presets/{presetId}",
            get(api_presets::get_preset_handler)
                .patch(api_presets::update_preset_handler)
                .delete(api_presets::delete_preset_handler),
        )
        .route("/api/ideas", post(api_stories::generate_ideas_handler))
        .route(
            "/api/stories",
            get(api_stories::list_stories_handler).post(api_stories::generate_story_handler),
        )
        .route(
            "/api/stories/favorites",
            get(api_stories::list_favorites_handler),
        )
        .route("/api/stories/{storyId}", get(api_stories::get_story_handler))
        .route(
            "/api/stories/{storyId}/favorite",
            post(api_stories::toggle_favorite_handler),
        )
        .route(
            "/api/stories/{storyId}/audio",
            post(api_stories::synthesize_audio_handler),
        )
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(api_auth::register_handler))
        .merge(protected_routes);

    // Serve stored audio blobs read-only under /media.
    let media_dir = state.engine.blobs().root().to_path_buf();
    let router = router.nest_service("/media", ServeDir::new(media_dir));

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
