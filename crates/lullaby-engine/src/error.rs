//! The typed error taxonomy for the generation services.
//!
//! Every failure a service can signal is one of these variants; raw
//! provider, cipher, and SQL errors are translated at their call sites and
//! never cross this boundary.

use lullaby_types::ProviderKind;
use thiserror::Error;

/// Errors surfaced by the generation services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No resolvable user for the request.
    #[error("user is not authenticated")]
    Unauthenticated,

    /// The record exists but belongs to a different user.
    #[error("not authorized to access this {0}")]
    Unauthorized(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller never stored an API key for this provider.
    #[error("no API key stored for the {0} provider; add one in settings")]
    MissingCredential(ProviderKindLabel),

    /// A stored credential failed to decrypt.
    #[error("stored API key could not be decrypted; store it again")]
    InvalidCredential,

    /// Generic upstream failure outside the generation/synthesis paths.
    #[error("provider call failed: {0}")]
    Provider(String),

    /// The speech provider already has a voice registered under this name.
    #[error("a voice named \"{0}\" already exists; voice names must be unique")]
    DuplicateVoiceName(String),

    /// The text provider call failed or returned unusable output.
    #[error("{0}")]
    GenerationFailed(String),

    /// The speech provider call failed or returned unusable output.
    #[error("audio synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Blob persistence failed.
    #[error("failed to store audio: {0}")]
    StorageFailed(String),

    /// Local persistence failed after a successful generation.
    #[error("generated content could not be saved: {0}")]
    SaveFailed(String),

    /// Another synthesis attempt holds the `generating` status.
    #[error("audio synthesis is already in progress for this story")]
    SynthesisInProgress,

    #[error("database error: {0}")]
    Database(String),

    /// Unexpected internal condition (e.g. credential encryption failure).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Human label for a provider kind, used in `MissingCredential` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderKindLabel(pub ProviderKind);

impl std::fmt::Display for ProviderKindLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ProviderKind::Text => f.write_str("text-generation"),
            ProviderKind::Speech => f.write_str("speech"),
        }
    }
}

impl EngineError {
    pub(crate) fn missing_credential(kind: ProviderKind) -> Self {
        Self::MissingCredential(ProviderKindLabel(kind))
    }

    /// Returns the provider kind when this is a missing-credential error.
    pub fn missing_credential_kind(&self) -> Option<ProviderKind> {
        match self {
            Self::MissingCredential(ProviderKindLabel(kind)) => Some(*kind),
            _ => None,
        }
    }
}

impl From<lullaby_store::StoreError> for EngineError {
    fn from(e: lullaby_store::StoreError) -> Self {
        match e {
            lullaby_store::StoreError::Database(err) => Self::Database(err.to_string()),
            lullaby_store::StoreError::NotFound(what) => Self::NotFound(what),
            lullaby_store::StoreError::Unauthorized(what) => Self::Unauthorized(what),
        }
    }
}
