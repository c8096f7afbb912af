//! Shared test harness: an in-memory database, a temp media directory, and
//! a fake provider server speaking both the chat-completions and the TTS
//! wire shapes on one ephemeral port.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lullaby_blobs::BlobStore;
use lullaby_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use lullaby_engine::{Engine, ProviderSettings};
use lullaby_secrets::SecretCipher;
use lullaby_store::{create_user, set_credential, NewChildProfile, NewStory};
use lullaby_types::{ChildProfile, ProviderKind, Story, User, UserContext};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Bytes the fake provider hands back as synthesized audio.
pub const FAKE_AUDIO: &[u8] = b"RIFF-fake-bedtime-audio";

#[derive(Default)]
pub struct FakeState {
    pub chat_calls: AtomicUsize,
    pub tts_calls: AtomicUsize,
    pub fail_tts: AtomicBool,
    pub fail_voice_delete: AtomicBool,
    pub registered_names: Mutex<HashSet<String>>,
    pub deleted_voices: Mutex<Vec<String>>,
    pub last_tts_body: Mutex<Option<Value>>,
}

async fn chat_handler(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);

    let content = if body.get("response_format").is_some() {
        json!({
            "stories": [
                {"id": "1", "title": "The Sleepy Comet", "description": "A comet learns to rest."},
                {"id": "2", "title": "The Lonely Stegosaurus", "description": "A stegosaurus looks for a friend."},
                {"id": "3", "title": "Moonlight Picnic", "description": "Friends share a picnic under the moon."},
                {"id": "4", "title": "The Brave Little Fern", "description": "A fern grows toward the light."},
                {"id": "5", "title": "Clouds Go to Bed", "description": "Even clouds need a bedtime."}
            ]
        })
        .to_string()
    } else {
        "Once upon a time, a quiet adventure unfolded. \"Goodnight,\" said the moon. The end."
            .to_string()
    };

    Json(json!({"choices": [{"message": {"content": content}}]}))
}

async fn tts_handler(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.tts_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_tts_body.lock().unwrap() = Some(body);

    if state.fail_tts.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "synthesis backend unavailable"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "generations": [{
                "generation_id": "gen-123",
                "audio": BASE64.encode(FAKE_AUDIO),
            }]
        })),
    )
}

async fn create_voice_handler(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let mut names = state.registered_names.lock().unwrap();

    if !names.insert(name.clone()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "details": {
                    "type": "error",
                    "message": "Voice name must be unique",
                    "code": "E0603",
                    "slug": "client_error"
                }
            })),
        );
    }

    (StatusCode::OK, Json(json!({"id": format!("voice-{name}")})))
}

async fn delete_voice_handler(
    State(state): State<Arc<FakeState>>,
    Path(voice_id): Path<String>,
) -> impl IntoResponse {
    if state.fail_voice_delete.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "registry unavailable"})),
        );
    }
    state.deleted_voices.lock().unwrap().push(voice_id);
    (StatusCode::OK, Json(json!({"ok": true})))
}

pub struct FakeProviders {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

/// Binds the fake provider on an ephemeral port and serves it for the rest
/// of the test process.
pub async fn spawn_fake_providers() -> FakeProviders {
    let state = Arc::new(FakeState::default());

    let router = Router::new()
        .route("/v1/chat/completions", post(chat_handler))
        .route("/v0/tts", post(tts_handler))
        .route("/v0/tts/voices", post(create_voice_handler))
        .route("/v0/tts/voices/{voiceId}", delete(delete_voice_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind fake provider");
    let addr = listener.local_addr().expect("should read local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake provider serve");
    });

    FakeProviders {
        base_url: format!("http://{addr}"),
        state,
    }
}

pub struct TestHarness {
    pub engine: Engine,
    pub pool: DbPool,
    pub cipher: SecretCipher,
    pub providers: FakeProviders,
    pub user: User,
    pub ctx: UserContext,
    // Held so the media directory outlives the test.
    #[allow(dead_code)]
    pub media_dir: TempDir,
}

/// Builds an engine wired to the fake provider, with one registered user.
pub async fn setup() -> TestHarness {
    let providers = spawn_fake_providers().await;

    let pool = create_pool(":memory:", DbRuntimeSettings::default()).expect("pool");
    {
        let conn = pool.get().expect("conn");
        run_migrations(&conn).expect("migrations");
    }

    let user = {
        let conn = pool.get().expect("conn");
        create_user(&conn, "parent@example.com").expect("user")
    };
    let ctx = UserContext::new(user.id.clone());

    let cipher = SecretCipher::from_secret("test-secret");
    let media_dir = tempfile::tempdir().expect("media dir");

    let engine = Engine::new(
        pool.clone(),
        cipher.clone(),
        BlobStore::new(media_dir.path()),
        ProviderSettings {
            text_base_url: providers.base_url.clone(),
            speech_base_url: providers.base_url.clone(),
            text_model: "test-model".to_string(),
            synthesis_timeout_secs: 10,
        },
    );

    TestHarness {
        engine,
        pool,
        cipher,
        providers,
        user,
        ctx,
        media_dir,
    }
}

impl TestHarness {
    /// Stores an encrypted provider key for the harness user.
    pub fn store_key(&self, kind: ProviderKind) {
        let conn = self.pool.get().expect("conn");
        let encrypted = self.cipher.encrypt("sk-test").expect("encrypt");
        set_credential(&conn, &self.user.id, kind, &encrypted).expect("set credential");
    }

    pub fn create_child(&self) -> ChildProfile {
        let conn = self.pool.get().expect("conn");
        lullaby_store::create_child_profile(
            &conn,
            &self.user.id,
            &NewChildProfile {
                name: "Mia".to_string(),
                age: 5,
                interests: "dinosaurs".to_string(),
            },
        )
        .expect("child profile")
    }

    /// Inserts a pending story narrated by an inline voice description.
    pub fn insert_described_story(&self) -> Story {
        let conn = self.pool.get().expect("conn");
        lullaby_store::insert_story(
            &conn,
            &self.user.id,
            &NewStory {
                child_id: None,
                child_name: "Mia".to_string(),
                title: "The Lonely Stegosaurus".to_string(),
                content: "Once upon a time, a stegosaurus found a friend.".to_string(),
                voice_preset_id: None,
                voice_name: "Grandma".to_string(),
                voice_description: Some("A warm, gentle grandmother".to_string()),
            },
        )
        .expect("story")
    }

    pub fn reload_story(&self, story_id: &str) -> Story {
        let conn = self.pool.get().expect("conn");
        lullaby_store::get_story(&conn, &self.user.id, story_id)
            .expect("get story")
            .expect("story exists")
    }
}
