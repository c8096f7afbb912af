//! The generation services of the Lullaby platform.
//!
//! Four services share this crate: story-idea generation, full story
//! generation, narration synthesis (the orchestrator), and voice preset
//! provisioning. Each invocation is an independent request-scoped task
//! taking an explicit [`UserContext`]; there is no ambient "current user"
//! and no shared mutable state between invocations beyond the connection
//! pool and the media directory.
//!
//! Ownership and existence checks always run before any external provider
//! call, so a bad request never spends provider quota.

use lullaby_blobs::BlobStore;
use lullaby_db::DbPool;
use lullaby_secrets::SecretCipher;
use lullaby_types::inputs::{ChildDescriptor, ChildSelector, VoiceSelector};
use lullaby_types::UserContext;

mod credentials;
mod error;
mod ideas;
mod presets;
mod prompts;
mod story;
mod voice;

pub use error::{EngineError, ProviderKindLabel};
pub use ideas::IDEA_COUNT;
pub use prompts::{FALLBACK_VOICE_DESCRIPTION, PRESET_SAMPLE_SCRIPT};

/// External provider endpoints and model selection.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the text-generation provider.
    pub text_base_url: String,
    /// Base URL of the speech-synthesis provider.
    pub speech_base_url: String,
    /// Model requested from the text provider.
    pub text_model: String,
    /// Timeout for speech synthesis, in seconds. Synthesis of a full story
    /// runs minutes, not seconds.
    pub synthesis_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            text_base_url: "https://api.openai.com".to_string(),
            speech_base_url: "https://api.hume.ai".to_string(),
            text_model: "gpt-4o".to_string(),
            synthesis_timeout_secs: 300,
        }
    }
}

/// The service layer: owns the pool, the credential cipher, blob storage,
/// and the provider endpoints.
pub struct Engine {
    pool: DbPool,
    cipher: SecretCipher,
    blobs: BlobStore,
    providers: ProviderSettings,
}

/// A child profile resolved from its selector, ready for prompt building.
pub(crate) struct ResolvedChild {
    /// Present only for the saved-profile case.
    pub child_id: Option<String>,
    pub descriptor: ChildDescriptor,
}

/// A voice resolved from its selector, ready for story denormalization.
pub(crate) struct ResolvedVoice {
    /// Present only for the saved-preset case.
    pub preset_id: Option<String>,
    pub name: String,
    /// Present only for the inline case; the preset case carries the
    /// provider voice id on the preset row instead.
    pub description: Option<String>,
}

impl Engine {
    pub fn new(
        pool: DbPool,
        cipher: SecretCipher,
        blobs: BlobStore,
        providers: ProviderSettings,
    ) -> Self {
        Self {
            pool,
            cipher,
            blobs,
            providers,
        }
    }

    /// The blob store backing audio persistence (the server uses it to
    /// resolve public URLs).
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Runs a closure against a pooled connection on the blocking thread
    /// pool. rusqlite work must never run directly on the async executor.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| EngineError::Database(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| EngineError::Database(format!("task join error: {e}")))?
    }

    /// Resolves a child selector, ownership-checked for the saved case.
    pub(crate) async fn resolve_child(
        &self,
        ctx: &UserContext,
        selector: &ChildSelector,
    ) -> Result<ResolvedChild, EngineError> {
        match selector {
            ChildSelector::Saved { child_id } => {
                let user_id = ctx.user_id.clone();
                let id = child_id.clone();
                let profile = self
                    .with_conn(move |conn| {
                        Ok(lullaby_store::get_child_profile(conn, &user_id, &id)?)
                    })
                    .await?
                    .ok_or(EngineError::NotFound("child profile"))?;

                Ok(ResolvedChild {
                    child_id: Some(profile.id.clone()),
                    descriptor: ChildDescriptor {
                        name: profile.name,
                        age: profile.age,
                        interests: profile.interests,
                    },
                })
            }
            ChildSelector::Inline {
                name,
                age,
                interests,
            } => Ok(ResolvedChild {
                child_id: None,
                descriptor: ChildDescriptor {
                    name: name.clone(),
                    age: *age,
                    interests: interests.clone(),
                },
            }),
        }
    }

    /// Resolves a voice selector, ownership-checked for the preset case.
    pub(crate) async fn resolve_voice(
        &self,
        ctx: &UserContext,
        selector: &VoiceSelector,
    ) -> Result<ResolvedVoice, EngineError> {
        match selector {
            VoiceSelector::Preset { preset_id } => {
                let user_id = ctx.user_id.clone();
                let id = preset_id.clone();
                let preset = self
                    .with_conn(move |conn| {
                        Ok(lullaby_store::get_voice_preset(conn, &user_id, &id)?)
                    })
                    .await?
                    .ok_or(EngineError::NotFound("voice preset"))?;

                Ok(ResolvedVoice {
                    preset_id: Some(preset.id),
                    name: preset.name,
                    description: None,
                })
            }
            VoiceSelector::Inline { name, description } => Ok(ResolvedVoice {
                preset_id: None,
                name: name.clone(),
                description: Some(description.clone()),
            }),
        }
    }
}
