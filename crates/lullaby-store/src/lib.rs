//! Ownership-scoped persistence for the Lullaby platform.
//!
//! Every row in Lullaby is exclusively owned by one user, and every function
//! in this crate takes the owning `user_id` explicitly. Reads scoped to a
//! non-owner degrade to `None`/empty (so record existence is not leaked);
//! mutations by a non-owner fail with [`StoreError::Unauthorized`].
//!
//! The story audio-status state machine lives here too:
//! [`stories::begin_audio_generation`] is a conditional update that succeeds
//! for exactly one of any set of concurrent callers.

use thiserror::Error;

pub mod children;
pub mod presets;
pub mod stories;
pub mod users;

#[cfg(test)]
mod tests;

pub use children::{
    create_child_profile, delete_child_profile, get_child_profile, list_child_profiles,
    update_child_profile, ChildProfileUpdate, NewChildProfile,
};
pub use presets::{
    delete_voice_preset_row, get_voice_preset, insert_voice_preset, list_voice_presets,
    load_owned_preset, update_voice_preset, NewVoicePreset, VoicePresetUpdate,
};
pub use stories::{
    begin_audio_generation, fail_audio, finish_audio, get_story, insert_story,
    list_favorite_stories, list_stories, list_stories_for_child, list_story_titles,
    load_owned_story, toggle_favorite, NewStory,
};
pub use users::{
    create_user, credential_status, get_user, get_user_by_email, get_user_by_token, set_credential,
};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The record exists but belongs to a different user.
    #[error("not authorized to access this {0}")]
    Unauthorized(&'static str),
}
