//! User rows and encrypted-credential storage.

use lullaby_types::{CredentialStatus, EncryptedCredential, ProviderKind, User};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::StoreError;

const USER_COLUMNS: &str = "id, email, auth_token,
    text_key_ciphertext, text_key_nonce,
    speech_key_ciphertext, speech_key_nonce,
    created_at, updated_at";

fn map_row_to_user(row: &Row<'_>) -> Result<User, rusqlite::Error> {
    let text_ct: Option<Vec<u8>> = row.get(3)?;
    let text_nonce: Option<Vec<u8>> = row.get(4)?;
    let speech_ct: Option<Vec<u8>> = row.get(5)?;
    let speech_nonce: Option<Vec<u8>> = row.get(6)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        auth_token: row.get(2)?,
        text_credential: text_ct.zip(text_nonce).map(|(ciphertext, nonce)| {
            EncryptedCredential { ciphertext, nonce }
        }),
        speech_credential: speech_ct.zip(speech_nonce).map(|(ciphertext, nonce)| {
            EncryptedCredential { ciphertext, nonce }
        }),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Creates a user with a freshly generated id and auth token.
///
/// The email must be unique; a duplicate surfaces as a SQLite constraint
/// violation inside [`StoreError::Database`].
pub fn create_user(conn: &Connection, email: &str) -> Result<User, StoreError> {
    let id = Uuid::new_v4().to_string();
    let auth_token = Uuid::new_v4().simple().to_string();

    conn.execute(
        "INSERT INTO users (id, email, auth_token) VALUES (?1, ?2, ?3)",
        params![id, email, auth_token],
    )?;

    get_user(conn, &id)?.ok_or(StoreError::NotFound("user"))
}

/// Retrieves a user by id.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [user_id], map_row_to_user)
        .optional()?)
}

/// Retrieves a user by email.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    Ok(conn.query_row(&sql, [email], map_row_to_user).optional()?)
}

/// Resolves a bearer auth token to its user.
///
/// Returns `None` for unknown tokens; the caller translates that into an
/// authentication failure.
pub fn get_user_by_token(conn: &Connection, token: &str) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE auth_token = ?1");
    Ok(conn.query_row(&sql, [token], map_row_to_user).optional()?)
}

/// Stores an encrypted provider credential on the user row.
///
/// Overwrites any previously stored credential for the same provider and
/// bumps `updated_at`.
pub fn set_credential(
    conn: &Connection,
    user_id: &str,
    kind: ProviderKind,
    credential: &EncryptedCredential,
) -> Result<(), StoreError> {
    let sql = match kind {
        ProviderKind::Text => {
            "UPDATE users
             SET text_key_ciphertext = ?1, text_key_nonce = ?2, updated_at = datetime('now')
             WHERE id = ?3"
        }
        ProviderKind::Speech => {
            "UPDATE users
             SET speech_key_ciphertext = ?1, speech_key_nonce = ?2, updated_at = datetime('now')
             WHERE id = ?3"
        }
    };

    let updated = conn.execute(
        sql,
        params![credential.ciphertext, credential.nonce, user_id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound("user"));
    }
    Ok(())
}

/// Reports which provider credentials a user has stored.
///
/// Only booleans leave this function; the ciphertext stays in the row.
pub fn credential_status(conn: &Connection, user_id: &str) -> Result<CredentialStatus, StoreError> {
    conn.query_row(
        "SELECT text_key_ciphertext IS NOT NULL, speech_key_ciphertext IS NOT NULL
         FROM users WHERE id = ?1",
        [user_id],
        |row| {
            Ok(CredentialStatus {
                text: row.get(0)?,
                speech: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::NotFound("user"))
}
