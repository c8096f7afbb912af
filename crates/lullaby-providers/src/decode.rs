//! Decoder for the speech provider's structured error payloads.
//!
//! The provider reports a voice-name conflict as a specific code/slug pair
//! inside a `details` object. Pattern-matching that shape lives here and
//! nowhere else, so a provider contract change only requires updating this
//! module.

use serde::Deserialize;

/// Slug the provider attaches to client-caused failures.
const CLIENT_ERROR_SLUG: &str = "client_error";

/// Error code for "a voice with this name already exists".
const DUPLICATE_NAME_CODE: &str = "E0603";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    details: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    code: String,
    slug: String,
    #[serde(default)]
    #[allow(dead_code)]
    message: String,
}

/// Returns `true` when an error body is the provider's duplicate-voice-name
/// conflict. Any body that does not parse into the expected shape is not a
/// conflict; callers fall back to a generic provider error.
pub fn is_duplicate_voice_name(body: &str) -> bool {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            parsed.details.code == DUPLICATE_NAME_CODE
                && parsed.details.slug == CLIENT_ERROR_SLUG
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_conflict_shape() {
        let body = r#"{
            "details": {
                "type": "error",
                "message": "Voice name must be unique",
                "code": "E0603",
                "slug": "client_error"
            }
        }"#;
        assert!(is_duplicate_voice_name(body));
    }

    #[test]
    fn other_codes_are_not_conflicts() {
        let body = r#"{"details":{"code":"E0400","slug":"client_error","message":"bad"}}"#;
        assert!(!is_duplicate_voice_name(body));

        let body = r#"{"details":{"code":"E0603","slug":"server_error","message":"bad"}}"#;
        assert!(!is_duplicate_voice_name(body));
    }

    #[test]
    fn malformed_bodies_fall_through() {
        assert!(!is_duplicate_voice_name("not json"));
        assert!(!is_duplicate_voice_name(r#"{"error":"nope"}"#));
        assert!(!is_duplicate_voice_name(r#"{"details":{}}"#));
    }
}
