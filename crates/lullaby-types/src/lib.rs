//! Shared types and constants for the Lullaby platform.
//!
//! This crate provides the foundational types used across all Lullaby crates:
//! the domain entities (users, child profiles, voice presets, stories), the
//! audio-status state machine, and the tagged selector inputs used by the
//! generation services.
//!
//! No crate in the workspace depends on anything *except* `lullaby-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

pub mod inputs;

pub use inputs::{ChildDescriptor, ChildSelector, StoryIdea, VoiceSelector};

/// Lifecycle stage of narration synthesis for a story.
///
/// Transitions: `Pending --(begin)--> Generating --(success)--> Ready`,
/// `Generating --(failure)--> Error`. `Error` is terminal until a caller
/// explicitly retries, which re-enters at `Generating`. No transition skips
/// `Generating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStatus {
    /// Story exists, no synthesis attempt has started.
    Pending,
    /// A synthesis attempt is in flight.
    Generating,
    /// Synthesis succeeded; an audio blob reference is attached.
    Ready,
    /// The last synthesis attempt failed.
    Error,
}

impl AudioStatus {
    /// Returns the canonical string form stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// Attempts to parse the database string form.
    ///
    /// Returns `None` for unrecognized strings.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "generating" => Some(Self::Generating),
            "ready" => Some(Self::Ready),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for AudioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which external provider a stored credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// The text-generation provider (story ideas and story text).
    Text,
    /// The speech-synthesis provider (narration and voice registry).
    Speech,
}

/// An API key encrypted at rest with AES-256-GCM.
///
/// The plaintext never touches the database; only the ciphertext and the
/// per-encryption nonce are persisted on the owning user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedCredential {
    /// AES-GCM ciphertext (includes the authentication tag).
    pub ciphertext: Vec<u8>,
    /// The 12-byte nonce used for this encryption.
    pub nonce: Vec<u8>,
}

/// The authenticated caller of a service operation.
///
/// Constructed once per request by the auth layer and passed explicitly into
/// every store/engine call; there is no ambient "current user" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// Stable identifier of the authenticated user.
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// A registered user account.
///
/// Deliberately not serializable: the auth token and encrypted credentials
/// must never leak through a JSON response.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Bearer credential presented by the client on every request.
    pub auth_token: String,
    /// Encrypted text-provider API key, if one has been stored.
    pub text_credential: Option<EncryptedCredential>,
    /// Encrypted speech-provider API key, if one has been stored.
    pub speech_credential: Option<EncryptedCredential>,
    pub created_at: String,
    pub updated_at: String,
}

/// Which provider credentials a user has stored (booleans only; the
/// ciphertext itself is never exposed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub text: bool,
    pub speech: bool,
}

/// A child profile owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub age: i64,
    /// Free-text interests, e.g. "dinosaurs, space, drawing".
    pub interests: String,
    pub created_at: String,
}

/// A saved, reusable narration voice registered with the speech provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePreset {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    /// The provider's persistent voice identifier.
    pub provider_voice_id: String,
    /// Blob reference for the sample narration stored at provisioning time.
    pub sample_blob: String,
    pub created_at: String,
}

/// A generated story and its narration state.
///
/// `child_name` and `voice_name` are denormalized snapshots captured at
/// story-creation time, so later edits or deletions of the source profile
/// or preset do not alter historical story display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub user_id: String,
    pub child_id: Option<String>,
    pub child_name: String,
    pub title: String,
    pub content: String,
    pub voice_preset_id: Option<String>,
    pub voice_name: String,
    /// Free-text voice description when the voice was entered manually.
    pub voice_description: Option<String>,
    /// Blob reference for the synthesized narration, once ready.
    pub audio_blob: Option<String>,
    pub audio_status: AudioStatus,
    pub is_favorite: bool,
    pub created_at: String,
}
