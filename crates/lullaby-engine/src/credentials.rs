//! Per-user provider credential storage and resolution.
//!
//! Keys are encrypted before they reach the store and decrypted on demand
//! for a single provider call; the plaintext lives only on the stack of the
//! invoking task.

use lullaby_types::{CredentialStatus, ProviderKind, UserContext};

use crate::{Engine, EngineError};

impl Engine {
    /// Encrypts and stores a provider API key for the calling user.
    pub async fn store_credential(
        &self,
        ctx: &UserContext,
        kind: ProviderKind,
        api_key: &str,
    ) -> Result<(), EngineError> {
        let encrypted = self
            .cipher
            .encrypt(api_key)
            .map_err(|_| EngineError::Internal("credential encryption failed".to_string()))?;

        let user_id = ctx.user_id.clone();
        self.with_conn(move |conn| {
            lullaby_store::set_credential(conn, &user_id, kind, &encrypted)?;
            Ok(())
        })
        .await?;

        tracing::info!(provider = ?kind, "stored provider credential");
        Ok(())
    }

    /// Reports which provider credentials the calling user has stored.
    pub async fn credential_status(
        &self,
        ctx: &UserContext,
    ) -> Result<CredentialStatus, EngineError> {
        let user_id = ctx.user_id.clone();
        self.with_conn(move |conn| Ok(lullaby_store::credential_status(conn, &user_id)?))
            .await
    }

    /// Decrypts the calling user's API key for one provider.
    ///
    /// Fails with `MissingCredential` when no key was ever stored and
    /// `InvalidCredential` when the stored blob does not decrypt.
    pub(crate) async fn resolve_key(
        &self,
        ctx: &UserContext,
        kind: ProviderKind,
    ) -> Result<String, EngineError> {
        let user_id = ctx.user_id.clone();
        let user = self
            .with_conn(move |conn| Ok(lullaby_store::get_user(conn, &user_id)?))
            .await?
            .ok_or(EngineError::NotFound("user"))?;

        let credential = match kind {
            ProviderKind::Text => user.text_credential,
            ProviderKind::Speech => user.speech_credential,
        }
        .ok_or_else(|| EngineError::missing_credential(kind))?;

        self.cipher
            .decrypt(&credential)
            .map_err(|_| EngineError::InvalidCredential)
    }
}
