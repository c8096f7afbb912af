//! Prompt construction for the text provider, plus the fixed scripts used
//! by the speech pipeline.

use lullaby_types::inputs::{ChildDescriptor, StoryIdea};

use crate::ideas::IDEA_COUNT;

/// Target word range requested for a full story.
const STORY_WORDS: &str = "800-1000";

/// Hard ceiling on story length; the speech provider chokes on overlong
/// inputs.
const STORY_MAX_CHARS: usize = 5000;

/// The sample narration synthesized when provisioning a voice preset.
pub const PRESET_SAMPLE_SCRIPT: &str = "Once upon a time, in a magical forest, there lived a \
group of friendly animals. They all worked together to protect their home and had wonderful \
adventures every day.";

/// Safety-net voice used only when a story somehow carries neither a preset
/// nor a description. Story creation always sets one of the two, so this
/// exists for defense, not as an accepted data state.
pub const FALLBACK_VOICE_DESCRIPTION: &str =
    "A gentle, engaging storyteller perfect for children's bedtime stories";

/// Builds the idea-generation prompt.
///
/// Existing titles are embedded so the provider steers away from repeats.
pub(crate) fn idea_prompt(child: &ChildDescriptor, existing_titles: &[String]) -> String {
    let mut prompt = format!(
        "Generate {IDEA_COUNT} bedtime story ideas for {}, who is {} years old and interested \
         in {}. Each story idea should be child-appropriate, engaging, and suitable for bedtime \
         reading. Each idea should have a title of at most ten words and a one-to-two sentence \
         description that previews the plot.",
        child.name, child.age, child.interests
    );

    if !existing_titles.is_empty() {
        prompt.push_str(&format!(
            "\n\nHere are story titles that are already taken, avoid reusing them: {}",
            existing_titles.join(", ")
        ));
    }

    prompt
}

/// Builds the full-story prompt for a chosen idea.
pub(crate) fn story_prompt(idea: &StoryIdea, child: &ChildDescriptor) -> String {
    format!(
        "Write a bedtime story titled \"{}\" based on this description: {}. \
         This story is for {} who is {} years old and likes {}. The story should:\n\
         - Be appropriate for a child's bedtime reading\n\
         - Be around {STORY_WORDS} words\n\
         - Very strict: no more than {STORY_MAX_CHARS} characters! Make it shorter if needed!\n\
         - Have a clear beginning, middle, and end\n\
         - Include a positive message or moral\n\
         - Use age-appropriate language and concepts\n\
         - Encourage imagination and wonder\n\
         - End with a calm, peaceful conclusion suitable for bedtime\n\n\
         Format the story with proper paragraphs and include a couple of sentences of dialogue \
         where appropriate. Make it engaging, but calming - perfect for bedtime.",
        idea.title, idea.description, child.name, child.age, child.interests
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mia() -> ChildDescriptor {
        ChildDescriptor {
            name: "Mia".to_string(),
            age: 5,
            interests: "dinosaurs".to_string(),
        }
    }

    #[test]
    fn idea_prompt_embeds_child_and_titles() {
        let prompt = idea_prompt(&mia(), &["The Lonely Stegosaurus".to_string()]);
        assert!(prompt.contains("Mia"));
        assert!(prompt.contains("5 years old"));
        assert!(prompt.contains("dinosaurs"));
        assert!(prompt.contains("The Lonely Stegosaurus"));
    }

    #[test]
    fn idea_prompt_omits_title_section_when_history_empty() {
        let prompt = idea_prompt(&mia(), &[]);
        assert!(!prompt.contains("already taken"));
    }

    #[test]
    fn story_prompt_embeds_idea_and_constraints() {
        let idea = StoryIdea {
            id: "2".to_string(),
            title: "The Lonely Stegosaurus".to_string(),
            description: "A stegosaurus looks for a friend.".to_string(),
        };
        let prompt = story_prompt(&idea, &mia());
        assert!(prompt.contains("\"The Lonely Stegosaurus\""));
        assert!(prompt.contains("A stegosaurus looks for a friend."));
        assert!(prompt.contains("800-1000 words"));
        assert!(prompt.contains("5000 characters"));
        assert!(prompt.contains("positive message or moral"));
    }
}
