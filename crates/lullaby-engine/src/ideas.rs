//! Story-idea generation.

use std::collections::HashSet;

use lullaby_providers::TextClient;
use lullaby_types::inputs::{ChildSelector, StoryIdea};
use lullaby_types::{ProviderKind, UserContext};

use crate::{prompts, Engine, EngineError};

/// Ideas per batch. The provider is asked for exactly this many and the
/// response is rejected if it returns anything else.
pub const IDEA_COUNT: usize = 5;

fn generation_failed(e: lullaby_providers::TextError) -> EngineError {
    tracing::warn!(error = %e, "idea generation failed");
    EngineError::GenerationFailed(format!(
        "failed to generate story ideas ({e}); check that your text provider API key is valid"
    ))
}

/// Rejects idea batches that do not match the contract: exactly
/// [`IDEA_COUNT`] entries, non-empty titles and descriptions, unique ids.
fn validate_ideas(ideas: &[StoryIdea]) -> Result<(), EngineError> {
    if ideas.len() != IDEA_COUNT {
        return Err(EngineError::GenerationFailed(format!(
            "provider returned {} ideas instead of {IDEA_COUNT}",
            ideas.len()
        )));
    }

    let mut seen_ids = HashSet::new();
    for idea in ideas {
        if idea.title.trim().is_empty() || idea.description.trim().is_empty() {
            return Err(EngineError::GenerationFailed(
                "provider returned an idea with an empty title or description".to_string(),
            ));
        }
        if !seen_ids.insert(idea.id.as_str()) {
            return Err(EngineError::GenerationFailed(format!(
                "provider returned duplicate idea id \"{}\"",
                idea.id
            )));
        }
    }
    Ok(())
}

impl Engine {
    /// Generates a validated batch of bedtime story ideas.
    ///
    /// Single attempt, synchronous from the caller's perspective; a failed
    /// call is retried only by invoking this again.
    pub async fn generate_story_ideas(
        &self,
        ctx: &UserContext,
        selector: &ChildSelector,
    ) -> Result<Vec<StoryIdea>, EngineError> {
        // Credential and references resolve before the provider is touched.
        let api_key = self.resolve_key(ctx, ProviderKind::Text).await?;
        let child = self.resolve_child(ctx, selector).await?;

        let user_id = ctx.user_id.clone();
        let existing_titles = self
            .with_conn(move |conn| Ok(lullaby_store::list_story_titles(conn, &user_id)?))
            .await?;

        let prompt = prompts::idea_prompt(&child.descriptor, &existing_titles);

        let client = TextClient::new(
            &self.providers.text_base_url,
            &api_key,
            &self.providers.text_model,
        );
        let ideas = client
            .generate_ideas(&prompt)
            .await
            .map_err(generation_failed)?;

        validate_ideas(&ideas)?;

        tracing::debug!(
            child = %child.descriptor.name,
            avoided_titles = existing_titles.len(),
            "generated story ideas"
        );
        Ok(ideas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(id: &str) -> StoryIdea {
        StoryIdea {
            id: id.to_string(),
            title: format!("Title {id}"),
            description: format!("Description {id}"),
        }
    }

    #[test]
    fn accepts_five_unique_ideas() {
        let ideas: Vec<StoryIdea> = (1..=5).map(|i| idea(&i.to_string())).collect();
        assert!(validate_ideas(&ideas).is_ok());
    }

    #[test]
    fn rejects_wrong_count() {
        let ideas: Vec<StoryIdea> = (1..=4).map(|i| idea(&i.to_string())).collect();
        assert!(matches!(
            validate_ideas(&ideas),
            Err(EngineError::GenerationFailed(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut ideas: Vec<StoryIdea> = (1..=5).map(|i| idea(&i.to_string())).collect();
        ideas[4].id = "1".to_string();
        assert!(matches!(
            validate_ideas(&ideas),
            Err(EngineError::GenerationFailed(_))
        ));
    }

    #[test]
    fn rejects_blank_fields() {
        let mut ideas: Vec<StoryIdea> = (1..=5).map(|i| idea(&i.to_string())).collect();
        ideas[2].title = "   ".to_string();
        assert!(matches!(
            validate_ideas(&ideas),
            Err(EngineError::GenerationFailed(_))
        ));
    }
}
