//! Shared setup for server API tests: an app wired to an in-memory
//! database and a temp media directory. Provider base URLs point at a
//! closed port by default; tests in this suite exercise everything that
//! happens before (or instead of) a provider call.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use lullaby_blobs::BlobStore;
use lullaby_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use lullaby_engine::{Engine, ProviderSettings};
use lullaby_secrets::SecretCipher;
use lullaby_server::{app, AppState};
use lullaby_types::{ProviderKind, User};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub cipher: SecretCipher,
    #[allow(dead_code)]
    pub media_dir: TempDir,
}

/// App wired to a closed provider port: nothing in the test may reach a
/// provider, and an accidental call fails loudly.
pub fn setup_app() -> TestApp {
    setup_app_with_providers("http://127.0.0.1:9")
}

pub fn setup_app_with_providers(provider_base_url: &str) -> TestApp {
    let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    let cipher = SecretCipher::from_secret("test-secret");
    let media_dir = tempfile::tempdir().unwrap();

    let engine = Engine::new(
        pool.clone(),
        cipher.clone(),
        BlobStore::new(media_dir.path()),
        ProviderSettings {
            text_base_url: provider_base_url.to_string(),
            speech_base_url: provider_base_url.to_string(),
            text_model: "test-model".to_string(),
            synthesis_timeout_secs: 5,
        },
    );

    let state = AppState {
        pool: pool.clone(),
        engine: Arc::new(engine),
    };

    TestApp {
        router: app(state),
        pool,
        cipher,
        media_dir,
    }
}

impl TestApp {
    /// Registers a user directly in the store and returns the row.
    pub fn seed_user(&self, email: &str) -> User {
        let conn = self.pool.get().unwrap();
        lullaby_store::create_user(&conn, email).unwrap()
    }

    /// Stores an encrypted provider key for a user.
    #[allow(dead_code)]
    pub fn seed_key(&self, user: &User, kind: ProviderKind) {
        let conn = self.pool.get().unwrap();
        let encrypted = self.cipher.encrypt("sk-test").unwrap();
        lullaby_store::set_credential(&conn, &user.id, kind, &encrypted).unwrap();
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
