//! Voice preset rows.
//!
//! Presets are inserted only by the provisioning pipeline in
//! `lullaby-engine`, which registers the voice with the speech provider and
//! stores the sample blob before this row exists. Deletion is likewise
//! orchestrated there; this module only moves rows.

use lullaby_types::VoicePreset;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::StoreError;

/// Fields for a provisioned voice preset.
#[derive(Debug, Clone)]
pub struct NewVoicePreset {
    pub name: String,
    pub description: String,
    /// The provider's persistent voice identifier.
    pub provider_voice_id: String,
    /// Blob reference for the stored sample narration.
    pub sample_blob: String,
}

/// Partial update; only name and description are user-editable.
#[derive(Debug, Clone, Default)]
pub struct VoicePresetUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

const PRESET_COLUMNS: &str =
    "id, user_id, name, description, provider_voice_id, sample_blob, created_at";

fn map_row_to_preset(row: &Row<'_>) -> Result<VoicePreset, rusqlite::Error> {
    Ok(VoicePreset {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        provider_voice_id: row.get(4)?,
        sample_blob: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Inserts a provisioned preset owned by `user_id`.
pub fn insert_voice_preset(
    conn: &Connection,
    user_id: &str,
    preset: &NewVoicePreset,
) -> Result<VoicePreset, StoreError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO voice_presets (id, user_id, name, description, provider_voice_id, sample_blob)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            user_id,
            preset.name,
            preset.description,
            preset.provider_voice_id,
            preset.sample_blob,
        ],
    )?;

    get_voice_preset(conn, user_id, &id)?.ok_or(StoreError::NotFound("voice preset"))
}

/// Retrieves a preset, scoped to its owner. `None` for non-owners.
pub fn get_voice_preset(
    conn: &Connection,
    user_id: &str,
    preset_id: &str,
) -> Result<Option<VoicePreset>, StoreError> {
    let sql = format!("SELECT {PRESET_COLUMNS} FROM voice_presets WHERE id = ?1 AND user_id = ?2");
    Ok(conn
        .query_row(&sql, params![preset_id, user_id], map_row_to_preset)
        .optional()?)
}

/// Lists a user's presets, newest first.
pub fn list_voice_presets(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<VoicePreset>, StoreError> {
    let sql = format!(
        "SELECT {PRESET_COLUMNS} FROM voice_presets
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([user_id], map_row_to_preset)?;

    let mut presets = Vec::new();
    for row in rows {
        presets.push(row?);
    }
    Ok(presets)
}

/// Loads a preset for mutation, distinguishing missing from unowned.
pub fn load_owned_preset(
    conn: &Connection,
    user_id: &str,
    preset_id: &str,
) -> Result<VoicePreset, StoreError> {
    let sql = format!("SELECT {PRESET_COLUMNS} FROM voice_presets WHERE id = ?1");
    let preset = conn
        .query_row(&sql, [preset_id], map_row_to_preset)
        .optional()?
        .ok_or(StoreError::NotFound("voice preset"))?;

    if preset.user_id != user_id {
        return Err(StoreError::Unauthorized("voice preset"));
    }
    Ok(preset)
}

/// Updates a preset's name/description in one statement.
pub fn update_voice_preset(
    conn: &Connection,
    user_id: &str,
    preset_id: &str,
    updates: &VoicePresetUpdate,
) -> Result<(), StoreError> {
    load_owned_preset(conn, user_id, preset_id)?;

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    if let Some(name) = &updates.name {
        set_parts.push(format!("name = ?{}", idx));
        values.push(Box::new(name.clone()));
        idx += 1;
    }
    if let Some(description) = &updates.description {
        set_parts.push(format!("description = ?{}", idx));
        values.push(Box::new(description.clone()));
        idx += 1;
    }

    if set_parts.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "UPDATE voice_presets SET {} WHERE id = ?{}",
        set_parts.join(", "),
        idx
    );
    values.push(Box::new(preset_id.to_string()));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| &**p).collect();
    conn.execute(&sql, params_refs.as_slice())?;
    Ok(())
}

/// Deletes the preset row itself.
///
/// Provider-side voice removal and sample-blob deletion are sequenced by
/// the engine before this is called.
pub fn delete_voice_preset_row(
    conn: &Connection,
    user_id: &str,
    preset_id: &str,
) -> Result<(), StoreError> {
    let deleted = conn.execute(
        "DELETE FROM voice_presets WHERE id = ?1 AND user_id = ?2",
        params![preset_id, user_id],
    )?;
    if deleted == 0 {
        return Err(StoreError::NotFound("voice preset"));
    }
    Ok(())
}
