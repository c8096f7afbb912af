//! Voice preset provisioning and deletion.
//!
//! Provisioning is the only path that creates preset rows: it synthesizes a
//! fixed sample script with the requested description, registers the
//! resulting generation as a persistent named voice with the provider,
//! stores the sample audio, and only then inserts the row. A failure after
//! provider-side registration leaves an orphaned provider voice; that gap
//! is logged and accepted, not auto-reconciled.

use std::time::Duration;

use lullaby_blobs::BlobRef;
use lullaby_providers::{SpeechClient, SpeechError, SynthesisRequest, SynthesisVoice, Utterance};
use lullaby_store::NewVoicePreset;
use lullaby_types::{ProviderKind, UserContext, VoicePreset};

use crate::{prompts, Engine, EngineError};

impl Engine {
    fn speech_client(&self, api_key: &str) -> SpeechClient {
        SpeechClient::new(&self.providers.speech_base_url, api_key)
            .with_synthesis_timeout(Duration::from_secs(self.providers.synthesis_timeout_secs))
    }

    /// Provisions a reusable named voice from a free-text description.
    pub async fn create_voice_preset(
        &self,
        ctx: &UserContext,
        name: &str,
        description: &str,
    ) -> Result<VoicePreset, EngineError> {
        let api_key = self.resolve_key(ctx, ProviderKind::Speech).await?;
        let client = self.speech_client(&api_key);

        // Sample narration first; its generation id is what gets saved as
        // the persistent voice.
        let sample = client
            .synthesize(&SynthesisRequest {
                utterances: vec![Utterance {
                    text: prompts::PRESET_SAMPLE_SCRIPT.to_string(),
                    voice: SynthesisVoice::Described {
                        description: description.to_string(),
                    },
                }],
            })
            .await
            .map_err(|e| {
                EngineError::SynthesisFailed(format!("failed to generate the voice sample: {e}"))
            })?;

        let voice_id = client
            .create_voice(name, &sample.generation_id)
            .await
            .map_err(|e| match e {
                SpeechError::DuplicateVoiceName(taken) => EngineError::DuplicateVoiceName(taken),
                other => EngineError::Provider(format!("failed to save the voice: {other}")),
            })?;

        // The provider-side voice now exists. Anything failing below
        // orphans it on the provider account.
        let audio = sample.audio_bytes().map_err(|e| {
            tracing::warn!(voice_id = %voice_id, "provider voice orphaned: sample audio malformed");
            EngineError::SynthesisFailed(e.to_string())
        })?;

        let blob = self.blobs.store(&audio, "audio/wav").await.map_err(|e| {
            tracing::warn!(voice_id = %voice_id, "provider voice orphaned: sample blob store failed");
            EngineError::StorageFailed(e.to_string())
        })?;

        let new_preset = NewVoicePreset {
            name: name.to_string(),
            description: description.to_string(),
            provider_voice_id: voice_id.clone(),
            sample_blob: blob.as_str().to_string(),
        };
        let user_id = ctx.user_id.clone();
        let preset = self
            .with_conn(move |conn| {
                lullaby_store::insert_voice_preset(conn, &user_id, &new_preset).map_err(|e| {
                    tracing::warn!(
                        voice_id = %new_preset.provider_voice_id,
                        "provider voice orphaned: preset row insert failed"
                    );
                    EngineError::SaveFailed(e.to_string())
                })
            })
            .await?;

        tracing::info!(preset = %preset.id, name = %preset.name, "voice preset provisioned");
        Ok(preset)
    }

    /// Deletes a voice preset.
    ///
    /// Provider-side voice removal is best-effort and never blocks; the
    /// stored sample, however, must delete successfully before the row is
    /// removed, or the blob would be orphaned with no referencing record.
    /// On sample-deletion failure the whole operation aborts and the
    /// preset stays.
    pub async fn delete_voice_preset(
        &self,
        ctx: &UserContext,
        preset_id: &str,
    ) -> Result<(), EngineError> {
        let user_id = ctx.user_id.clone();
        let id = preset_id.to_string();
        let preset = self
            .with_conn(move |conn| Ok(lullaby_store::load_owned_preset(conn, &user_id, &id)?))
            .await?;

        match self.resolve_key(ctx, ProviderKind::Speech).await {
            Ok(api_key) => {
                let client = self.speech_client(&api_key);
                if let Err(e) = client.delete_voice(&preset.provider_voice_id).await {
                    tracing::warn!(
                        preset = %preset.id,
                        voice_id = %preset.provider_voice_id,
                        error = %e,
                        "provider-side voice deletion failed, continuing"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    preset = %preset.id,
                    error = %e,
                    "no usable speech credential, skipping provider-side voice deletion"
                );
            }
        }

        self.blobs
            .delete(&BlobRef::new(preset.sample_blob.clone()))
            .await
            .map_err(|e| EngineError::StorageFailed(format!("failed to delete voice sample: {e}")))?;

        let user_id = ctx.user_id.clone();
        let id = preset_id.to_string();
        self.with_conn(move |conn| {
            Ok(lullaby_store::delete_voice_preset_row(conn, &user_id, &id)?)
        })
        .await?;

        tracing::info!(preset = preset_id, "voice preset deleted");
        Ok(())
    }
}
