//! Child profile CRUD.
//!
//! Deleting a profile never cascades into stories: story rows keep the
//! `child_name` snapshot taken at creation time, and the foreign key is
//! cleared by the schema's `ON DELETE SET NULL`.

use lullaby_types::ChildProfile;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::StoreError;

/// Fields for a new child profile.
#[derive(Debug, Clone)]
pub struct NewChildProfile {
    pub name: String,
    pub age: i64,
    pub interests: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ChildProfileUpdate {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub interests: Option<String>,
}

const CHILD_COLUMNS: &str = "id, user_id, name, age, interests, created_at";

fn map_row_to_child(row: &Row<'_>) -> Result<ChildProfile, rusqlite::Error> {
    Ok(ChildProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        interests: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Creates a child profile owned by `user_id`.
pub fn create_child_profile(
    conn: &Connection,
    user_id: &str,
    profile: &NewChildProfile,
) -> Result<ChildProfile, StoreError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO child_profiles (id, user_id, name, age, interests)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, user_id, profile.name, profile.age, profile.interests],
    )?;

    get_child_profile(conn, user_id, &id)?.ok_or(StoreError::NotFound("child profile"))
}

/// Retrieves a child profile, scoped to its owner.
///
/// Returns `None` both when the profile does not exist and when it belongs
/// to another user, so reads never leak existence.
pub fn get_child_profile(
    conn: &Connection,
    user_id: &str,
    child_id: &str,
) -> Result<Option<ChildProfile>, StoreError> {
    let sql = format!("SELECT {CHILD_COLUMNS} FROM child_profiles WHERE id = ?1 AND user_id = ?2");
    Ok(conn
        .query_row(&sql, params![child_id, user_id], map_row_to_child)
        .optional()?)
}

/// Lists a user's child profiles, newest first.
pub fn list_child_profiles(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<ChildProfile>, StoreError> {
    let sql = format!(
        "SELECT {CHILD_COLUMNS} FROM child_profiles
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([user_id], map_row_to_child)?;

    let mut profiles = Vec::new();
    for row in rows {
        profiles.push(row?);
    }
    Ok(profiles)
}

/// Loads a profile for mutation, distinguishing missing from unowned.
fn load_owned_child(
    conn: &Connection,
    user_id: &str,
    child_id: &str,
) -> Result<ChildProfile, StoreError> {
    let sql = format!("SELECT {CHILD_COLUMNS} FROM child_profiles WHERE id = ?1");
    let profile = conn
        .query_row(&sql, [child_id], map_row_to_child)
        .optional()?
        .ok_or(StoreError::NotFound("child profile"))?;

    if profile.user_id != user_id {
        return Err(StoreError::Unauthorized("child profile"));
    }
    Ok(profile)
}

/// Updates a child profile using a single atomic UPDATE statement.
///
/// Only fields that are `Some` in `updates` are modified.
pub fn update_child_profile(
    conn: &Connection,
    user_id: &str,
    child_id: &str,
    updates: &ChildProfileUpdate,
) -> Result<(), StoreError> {
    load_owned_child(conn, user_id, child_id)?;

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    if let Some(name) = &updates.name {
        set_parts.push(format!("name = ?{}", idx));
        values.push(Box::new(name.clone()));
        idx += 1;
    }
    if let Some(age) = updates.age {
        set_parts.push(format!("age = ?{}", idx));
        values.push(Box::new(age));
        idx += 1;
    }
    if let Some(interests) = &updates.interests {
        set_parts.push(format!("interests = ?{}", idx));
        values.push(Box::new(interests.clone()));
        idx += 1;
    }

    if set_parts.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "UPDATE child_profiles SET {} WHERE id = ?{}",
        set_parts.join(", "),
        idx
    );
    values.push(Box::new(child_id.to_string()));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| &**p).collect();
    conn.execute(&sql, params_refs.as_slice())?;
    Ok(())
}

/// Deletes a child profile owned by `user_id`.
pub fn delete_child_profile(
    conn: &Connection,
    user_id: &str,
    child_id: &str,
) -> Result<(), StoreError> {
    load_owned_child(conn, user_id, child_id)?;
    conn.execute("DELETE FROM child_profiles WHERE id = ?1", [child_id])?;
    Ok(())
}
