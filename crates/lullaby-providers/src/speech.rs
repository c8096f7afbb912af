//! Client for the speech-synthesis provider.
//!
//! Synthesis requests carry one or more utterances, each tagged with either
//! a persistent voice id (a saved provider-side voice) or a free-text voice
//! description. Synthesis is long-running, so the default timeout is minutes,
//! not seconds. The provider also exposes a voice registry: a generation can
//! be saved as a persistent named voice and deleted again.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::decode::is_duplicate_voice_name;

/// Default timeout for synthesis requests. Narrating a full story takes
/// minutes on the provider side.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for voice-registry calls, which are quick metadata operations.
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the speech-synthesis provider.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The provider rejected the API key.
    #[error("speech provider rejected the API key")]
    Auth,

    /// The provider already has a voice registered under this name.
    #[error("a voice named \"{0}\" already exists with the provider")]
    DuplicateVoiceName(String),

    /// The request ran past its deadline. Synthesis already dispatched is
    /// not recalled.
    #[error("speech provider timed out")]
    Timeout,

    #[error("speech provider returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("speech provider request failed: {0}")]
    Transport(reqwest::Error),

    /// The response arrived but did not have the expected shape.
    #[error("speech provider returned a malformed payload: {0}")]
    Malformed(String),
}

fn map_transport(e: reqwest::Error) -> SpeechError {
    if e.is_timeout() {
        SpeechError::Timeout
    } else {
        SpeechError::Transport(e)
    }
}

/// The voice a single utterance should be rendered with.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisVoice {
    /// A persistent provider-side voice id (saved preset).
    Preset { voice_id: String },
    /// A free-text voice description.
    Described { description: String },
}

/// One utterance to synthesize.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: SynthesisVoice,
}

impl Utterance {
    fn to_payload(&self) -> serde_json::Value {
        match &self.voice {
            SynthesisVoice::Preset { voice_id } => json!({
                "voice": {"id": voice_id},
                "text": self.text,
            }),
            SynthesisVoice::Described { description } => json!({
                "description": description,
                "text": self.text,
            }),
        }
    }
}

/// A synthesis request: one or more utterances rendered in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generation_id: String,
    audio: String,
}

#[derive(Debug, Deserialize)]
struct CreatedVoice {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateVoiceRequest<'a> {
    name: &'a str,
    generation_id: &'a str,
}

/// The result of one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Provider identifier for this generation; registering it as a
    /// persistent voice references this id.
    pub generation_id: String,
    /// Base64-encoded audio payload.
    pub audio_base64: String,
}

impl Synthesis {
    /// Decodes the audio payload.
    pub fn audio_bytes(&self) -> Result<Vec<u8>, SpeechError> {
        BASE64
            .decode(self.audio_base64.as_bytes())
            .map_err(|e| SpeechError::Malformed(format!("audio payload is not valid base64: {e}")))
    }
}

/// Client for the speech-synthesis provider.
///
/// Built per request with the calling user's decrypted API key.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    synthesis_timeout: Duration,
}

impl SpeechClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            synthesis_timeout: SYNTHESIS_TIMEOUT,
        }
    }

    /// Overrides the synthesis timeout (used by tests).
    pub fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    /// Synthesizes the request and returns the first generation.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis, SpeechError> {
        let url = format!("{}/v0/tts", self.base_url);
        tracing::debug!(
            utterances = request.utterances.len(),
            timeout_secs = self.synthesis_timeout.as_secs(),
            "dispatching synthesis request"
        );
        let body = json!({
            "utterances": request
                .utterances
                .iter()
                .map(Utterance::to_payload)
                .collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.synthesis_timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SpeechError::Auth);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Malformed(e.to_string()))?;

        parsed
            .generations
            .into_iter()
            .next()
            .map(|generation| Synthesis {
                generation_id: generation.generation_id,
                audio_base64: generation.audio,
            })
            .ok_or_else(|| SpeechError::Malformed("response contained no generations".to_string()))
    }

    /// Registers a previous generation as a persistent named voice.
    ///
    /// Voice names are unique per provider account; the conflict error is
    /// decoded into [`SpeechError::DuplicateVoiceName`].
    pub async fn create_voice(
        &self,
        name: &str,
        generation_id: &str,
    ) -> Result<String, SpeechError> {
        let url = format!("{}/v0/tts/voices", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REGISTRY_TIMEOUT)
            .json(&CreateVoiceRequest {
                name,
                generation_id,
            })
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SpeechError::Auth);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if is_duplicate_voice_name(&message) {
                return Err(SpeechError::DuplicateVoiceName(name.to_string()));
            }
            return Err(SpeechError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedVoice = response
            .json()
            .await
            .map_err(|e| SpeechError::Malformed(e.to_string()))?;
        Ok(created.id)
    }

    /// Deletes a persistent voice by its provider id.
    pub async fn delete_voice(&self, voice_id: &str) -> Result<(), SpeechError> {
        let url = format!("{}/v0/tts/voices/{}", self.base_url, voice_id);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_key)
            .timeout(REGISTRY_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SpeechError::Auth);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
