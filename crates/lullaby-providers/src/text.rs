//! Client for the text-generation provider.

use std::time::Duration;

use lullaby_types::StoryIdea;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Default timeout for text-generation requests. Long-form story text can
/// take a while, but nowhere near the speech-synthesis scale.
const TEXT_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors from the text-generation provider.
#[derive(Debug, Error)]
pub enum TextError {
    /// The provider rejected the API key.
    #[error("text provider rejected the API key")]
    Auth,

    #[error("text provider rate limited the request")]
    RateLimited,

    #[error("text provider returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("text provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response arrived but did not have the expected shape.
    #[error("text provider returned a malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct IdeaBatch {
    stories: Vec<StoryIdea>,
}

/// Client for a chat-completions-style text-generation endpoint.
///
/// Built per request with the calling user's decrypted API key; holds no
/// shared state beyond the reqwest connection pool.
#[derive(Debug, Clone)]
pub struct TextClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl TextClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: TEXT_TIMEOUT,
        }
    }

    /// Overrides the request timeout (used by tests).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn chat(&self, body: serde_json::Value) -> Result<String, TextError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TextError::Auth);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TextError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TextError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TextError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| TextError::Malformed("response contained no choices".to_string()))
    }

    /// Generates free-form text from a prompt.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, TextError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        self.chat(body).await
    }

    /// Generates a schema-constrained batch of story ideas.
    ///
    /// The provider is asked for a JSON object `{"stories": [...]}`; shape
    /// validation beyond JSON well-formedness (exactly five entries, unique
    /// ids) is the caller's responsibility.
    pub async fn generate_ideas(&self, prompt: &str) -> Result<Vec<StoryIdea>, TextError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "story_ideas",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "stories": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "id": {"type": "string"},
                                        "title": {"type": "string"},
                                        "description": {"type": "string"}
                                    },
                                    "required": ["id", "title", "description"],
                                    "additionalProperties": false
                                }
                            }
                        },
                        "required": ["stories"],
                        "additionalProperties": false
                    }
                }
            },
        });

        let content = self.chat(body).await?;
        let batch: IdeaBatch = serde_json::from_str(&content)
            .map_err(|e| TextError::Malformed(format!("idea payload is not valid JSON: {e}")))?;
        Ok(batch.stories)
    }
}
