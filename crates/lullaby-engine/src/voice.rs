//! Narration synthesis: the pipeline orchestrator.
//!
//! Drives a story through its audio state machine:
//! `pending --(begin)--> generating --(success)--> ready`, with any failure
//! after `begin` landing in `error`. `error` is terminal until the caller
//! explicitly retries, which re-enters at `generating`. A story already
//! `ready` re-runs synthesis when explicitly invoked; retry is a feature,
//! not an anomaly.

use std::time::Duration;

use lullaby_providers::{SpeechClient, SynthesisRequest, SynthesisVoice, Utterance};
use lullaby_types::{AudioStatus, ProviderKind, Story, UserContext};

use crate::{prompts, Engine, EngineError};

impl Engine {
    /// Synthesizes narration for a story the caller owns.
    ///
    /// Returns the story as it stands after the attempt (`ready` with an
    /// audio reference on success). On failure the story is left in
    /// `error` and the typed failure is returned.
    pub async fn synthesize_story_audio(
        &self,
        ctx: &UserContext,
        story_id: &str,
    ) -> Result<Story, EngineError> {
        // Credential resolves first: with no key stored, the story status
        // is untouched and no provider call is attempted.
        let api_key = self.resolve_key(ctx, ProviderKind::Speech).await?;

        let user_id = ctx.user_id.clone();
        let id = story_id.to_string();
        let story = self
            .with_conn(move |conn| Ok(lullaby_store::load_owned_story(conn, &user_id, &id)?))
            .await?;

        // Single-winner entry into `generating`: the update applies only if
        // the row still holds the status we just observed. A story already
        // in flight, or a concurrent attempt that wins the race, leaves us
        // with nothing to do but report it.
        if story.audio_status == AudioStatus::Generating {
            return Err(EngineError::SynthesisInProgress);
        }

        let user_id = ctx.user_id.clone();
        let id = story_id.to_string();
        let expected = story.audio_status;
        let won = self
            .with_conn(move |conn| {
                Ok(lullaby_store::begin_audio_generation(
                    conn, &user_id, &id, expected,
                )?)
            })
            .await?;
        if !won {
            return Err(EngineError::SynthesisInProgress);
        }

        tracing::info!(story = %story.id, from = %expected, "audio generation started");

        // The status write above is durable; from here every failure must
        // land the story in `error` before the error propagates.
        match self.run_synthesis(ctx, &story, &api_key).await {
            Ok(story) => Ok(story),
            Err(e) => {
                self.mark_failed(ctx, story_id).await;
                Err(e)
            }
        }
    }

    /// The fallible tail of the pipeline, from voice resolution to the
    /// final `ready` update. Runs only after the `generating` transition
    /// has been won.
    async fn run_synthesis(
        &self,
        ctx: &UserContext,
        story: &Story,
        api_key: &str,
    ) -> Result<Story, EngineError> {
        let voice = self.resolve_story_voice(ctx, story).await?;

        let client = SpeechClient::new(&self.providers.speech_base_url, api_key)
            .with_synthesis_timeout(Duration::from_secs(self.providers.synthesis_timeout_secs));
        let request = SynthesisRequest {
            utterances: vec![Utterance {
                text: story.content.clone(),
                voice,
            }],
        };

        let synthesis = client
            .synthesize(&request)
            .await
            .map_err(|e| EngineError::SynthesisFailed(e.to_string()))?;

        let audio = synthesis
            .audio_bytes()
            .map_err(|e| EngineError::SynthesisFailed(e.to_string()))?;

        let blob = self
            .blobs
            .store(&audio, "audio/wav")
            .await
            .map_err(|e| EngineError::StorageFailed(e.to_string()))?;

        let user_id = ctx.user_id.clone();
        let id = story.id.clone();
        let blob_ref = blob.as_str().to_string();
        self.with_conn(move |conn| {
            Ok(lullaby_store::finish_audio(conn, &user_id, &id, &blob_ref)?)
        })
        .await?;

        let user_id = ctx.user_id.clone();
        let id = story.id.clone();
        let updated = self
            .with_conn(move |conn| Ok(lullaby_store::get_story(conn, &user_id, &id)?))
            .await?
            .ok_or(EngineError::NotFound("story"))?;

        tracing::info!(story = %updated.id, blob = %blob, "audio generation finished");
        Ok(updated)
    }

    /// Picks the synthesis voice with strict precedence: saved preset, then
    /// the story's own description, then the generic fallback.
    async fn resolve_story_voice(
        &self,
        ctx: &UserContext,
        story: &Story,
    ) -> Result<SynthesisVoice, EngineError> {
        if let Some(preset_id) = &story.voice_preset_id {
            // A dangling or unowned preset is a hard failure, never a
            // silent fallback to the description.
            let user_id = ctx.user_id.clone();
            let id = preset_id.clone();
            let preset = self
                .with_conn(move |conn| Ok(lullaby_store::get_voice_preset(conn, &user_id, &id)?))
                .await?
                .ok_or(EngineError::NotFound("voice preset"))?;

            return Ok(SynthesisVoice::Preset {
                voice_id: preset.provider_voice_id,
            });
        }

        if let Some(description) = &story.voice_description {
            return Ok(SynthesisVoice::Described {
                description: description.clone(),
            });
        }

        // Story creation always sets a preset or a description, so this
        // branch is a safety net, not an accepted data state.
        tracing::warn!(story = %story.id, "story has no voice source, using fallback narrator");
        Ok(SynthesisVoice::Described {
            description: prompts::FALLBACK_VOICE_DESCRIPTION.to_string(),
        })
    }

    /// Best-effort transition to `error` after a failed attempt. A failure
    /// here leaves the story stuck in `generating`, the same observable
    /// state as a crash mid-call.
    async fn mark_failed(&self, ctx: &UserContext, story_id: &str) {
        let user_id = ctx.user_id.clone();
        let id = story_id.to_string();
        let result = self
            .with_conn(move |conn| Ok(lullaby_store::fail_audio(conn, &user_id, &id)?))
            .await;

        if let Err(e) = result {
            tracing::error!(story = story_id, error = %e, "failed to record audio error status");
        }
    }
}
