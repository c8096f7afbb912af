//! HTTP clients for the two external providers Lullaby depends on.
//!
//! - [`TextClient`] talks to a chat-completions-style text-generation
//!   provider, either for free-form story text or for JSON-schema-constrained
//!   idea batches.
//! - [`SpeechClient`] talks to a TTS provider that synthesizes utterances
//!   tagged with a persistent voice id or a free-text voice description, and
//!   manages the provider-side voice registry.
//!
//! Provider error payloads are decoded at the call site into typed errors;
//! the one provider-specific shape (the duplicate-voice-name conflict) is
//! isolated in [`decode`] so contract drift only touches that module.

pub mod decode;
pub mod speech;
pub mod text;

pub use speech::{
    SpeechClient, SpeechError, Synthesis, SynthesisRequest, SynthesisVoice, Utterance,
};
pub use text::{TextClient, TextError};
