//! Tagged selector inputs for the generation services.
//!
//! The original UI lets callers pick a saved record *or* type details
//! inline. Both input kinds are modeled as two-case tagged enums so
//! resolution logic switches explicitly on the tag instead of probing for
//! the presence of fields.

use serde::{Deserialize, Serialize};

/// How the caller identifies the child a story is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildSelector {
    /// Reference to a saved child profile (must belong to the caller).
    Saved { child_id: String },
    /// Ad-hoc details entered inline, not persisted as a profile.
    Inline {
        name: String,
        age: i64,
        interests: String,
    },
}

/// How the caller identifies the narration voice for a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoiceSelector {
    /// Reference to a saved voice preset (must belong to the caller).
    Preset { preset_id: String },
    /// Ad-hoc voice entered inline: a display name plus a free-text
    /// description handed to the speech provider.
    Inline { name: String, description: String },
}

/// The resolved child details embedded into generation prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildDescriptor {
    pub name: String,
    pub age: i64,
    pub interests: String,
}

/// One story idea returned by the idea-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryIdea {
    /// Unique id within the returned batch.
    pub id: String,
    /// Catchy, child-friendly title, at most ten words.
    pub title: String,
    /// One or two sentences previewing the plot.
    pub description: String,
}
