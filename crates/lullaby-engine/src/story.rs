//! Full story generation.

use lullaby_providers::TextClient;
use lullaby_store::NewStory;
use lullaby_types::inputs::{ChildSelector, StoryIdea, VoiceSelector};
use lullaby_types::{ProviderKind, Story, UserContext};

use crate::{prompts, Engine, EngineError};

fn generation_failed(e: lullaby_providers::TextError) -> EngineError {
    tracing::warn!(error = %e, "story generation failed");
    EngineError::GenerationFailed(format!(
        "failed to generate the story ({e}); check that your text provider API key is valid"
    ))
}

impl Engine {
    /// Expands a chosen idea into full story text and persists it.
    ///
    /// The new story starts in `pending` audio status, with the child name
    /// and voice name denormalized at this instant, so later edits or
    /// deletions of the source profile/preset leave the story's display
    /// unchanged.
    pub async fn generate_story(
        &self,
        ctx: &UserContext,
        idea: &StoryIdea,
        child_selector: &ChildSelector,
        voice_selector: &VoiceSelector,
    ) -> Result<Story, EngineError> {
        // Credential and both references resolve before the provider is
        // touched, so unresolvable input never spends provider quota.
        let api_key = self.resolve_key(ctx, ProviderKind::Text).await?;
        let child = self.resolve_child(ctx, child_selector).await?;
        let voice = self.resolve_voice(ctx, voice_selector).await?;

        let prompt = prompts::story_prompt(idea, &child.descriptor);

        let client = TextClient::new(
            &self.providers.text_base_url,
            &api_key,
            &self.providers.text_model,
        );
        let content = client
            .generate_text(&prompt)
            .await
            .map_err(generation_failed)?;

        let new_story = NewStory {
            child_id: child.child_id,
            child_name: child.descriptor.name,
            title: idea.title.clone(),
            content,
            voice_preset_id: voice.preset_id,
            voice_name: voice.name,
            voice_description: voice.description,
        };

        // Persistence failure after a successful generation is its own
        // signal: the generated text is not cached, the caller regenerates.
        let user_id = ctx.user_id.clone();
        let story = self
            .with_conn(move |conn| {
                lullaby_store::insert_story(conn, &user_id, &new_story)
                    .map_err(|e| EngineError::SaveFailed(e.to_string()))
            })
            .await?;

        tracing::info!(story = %story.id, title = %story.title, "story generated");
        Ok(story)
    }
}
