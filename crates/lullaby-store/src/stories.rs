//! Story rows and the audio-status state machine.
//!
//! Stories are inserted in `pending` with their display snapshots
//! (`child_name`, `voice_name`) fixed at that instant. The audio fields are
//! mutated only through the three transition functions at the bottom of
//! this module, keeping every status write in one place.

use lullaby_types::{AudioStatus, Story};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::children::get_child_profile;
use crate::StoreError;

/// Fields for a freshly generated story.
///
/// `child_name` and `voice_name` are the denormalized display snapshots;
/// the optional ids link back to the source records while they still exist.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub child_id: Option<String>,
    pub child_name: String,
    pub title: String,
    pub content: String,
    pub voice_preset_id: Option<String>,
    pub voice_name: String,
    pub voice_description: Option<String>,
}

const STORY_COLUMNS: &str = "id, user_id, child_id, child_name, title, content,
    voice_preset_id, voice_name, voice_description,
    audio_blob, audio_status, is_favorite, created_at";

fn map_row_to_story(row: &Row<'_>) -> Result<Story, rusqlite::Error> {
    let status_raw: String = row.get(10)?;
    let audio_status = AudioStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            format!("unknown audio status: {status_raw}").into(),
        )
    })?;

    Ok(Story {
        id: row.get(0)?,
        user_id: row.get(1)?,
        child_id: row.get(2)?,
        child_name: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        voice_preset_id: row.get(6)?,
        voice_name: row.get(7)?,
        voice_description: row.get(8)?,
        audio_blob: row.get(9)?,
        audio_status,
        is_favorite: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Inserts a story in `pending` audio status.
pub fn insert_story(
    conn: &Connection,
    user_id: &str,
    story: &NewStory,
) -> Result<Story, StoreError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO stories (
            id, user_id, child_id, child_name, title, content,
            voice_preset_id, voice_name, voice_description
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            user_id,
            story.child_id,
            story.child_name,
            story.title,
            story.content,
            story.voice_preset_id,
            story.voice_name,
            story.voice_description,
        ],
    )?;

    get_story(conn, user_id, &id)?.ok_or(StoreError::NotFound("story"))
}

/// Retrieves a story, scoped to its owner. `None` for non-owners.
pub fn get_story(
    conn: &Connection,
    user_id: &str,
    story_id: &str,
) -> Result<Option<Story>, StoreError> {
    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1 AND user_id = ?2");
    Ok(conn
        .query_row(&sql, params![story_id, user_id], map_row_to_story)
        .optional()?)
}

/// Loads a story for mutation, distinguishing missing from unowned.
pub fn load_owned_story(
    conn: &Connection,
    user_id: &str,
    story_id: &str,
) -> Result<Story, StoreError> {
    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1");
    let story = conn
        .query_row(&sql, [story_id], map_row_to_story)
        .optional()?
        .ok_or(StoreError::NotFound("story"))?;

    if story.user_id != user_id {
        return Err(StoreError::Unauthorized("story"));
    }
    Ok(story)
}

fn collect_stories(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Story>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row_to_story)?;

    let mut stories = Vec::new();
    for row in rows {
        stories.push(row?);
    }
    Ok(stories)
}

/// Lists a user's stories, newest first.
pub fn list_stories(conn: &Connection, user_id: &str) -> Result<Vec<Story>, StoreError> {
    let sql = format!(
        "SELECT {STORY_COLUMNS} FROM stories
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    );
    collect_stories(conn, &sql, [user_id])
}

/// Lists a user's favorited stories, newest first.
pub fn list_favorite_stories(conn: &Connection, user_id: &str) -> Result<Vec<Story>, StoreError> {
    let sql = format!(
        "SELECT {STORY_COLUMNS} FROM stories
         WHERE user_id = ?1 AND is_favorite = 1
         ORDER BY created_at DESC, rowid DESC"
    );
    collect_stories(conn, &sql, [user_id])
}

/// Lists stories for one child profile.
///
/// The child's ownership is verified first; a non-owner gets an empty list,
/// matching the read-degradation rule.
pub fn list_stories_for_child(
    conn: &Connection,
    user_id: &str,
    child_id: &str,
) -> Result<Vec<Story>, StoreError> {
    if get_child_profile(conn, user_id, child_id)?.is_none() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {STORY_COLUMNS} FROM stories
         WHERE user_id = ?1 AND child_id = ?2
         ORDER BY created_at DESC, rowid DESC"
    );
    collect_stories(conn, &sql, params![user_id, child_id])
}

/// Returns every story title the user has, for idea de-duplication.
pub fn list_story_titles(conn: &Connection, user_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT title FROM stories WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([user_id], |row| row.get(0))?;

    let mut titles = Vec::new();
    for row in rows {
        titles.push(row?);
    }
    Ok(titles)
}

/// Flips a story's favorite flag, returning the new value.
pub fn toggle_favorite(
    conn: &Connection,
    user_id: &str,
    story_id: &str,
) -> Result<bool, StoreError> {
    let story = load_owned_story(conn, user_id, story_id)?;
    let new_value = !story.is_favorite;

    conn.execute(
        "UPDATE stories SET is_favorite = ?1 WHERE id = ?2",
        params![new_value, story_id],
    )?;
    Ok(new_value)
}

/// Conditionally transitions a story into `generating`.
///
/// The update applies only while the row still holds `expected`, the
/// status observed when the caller loaded the story. Of any set of
/// concurrent synthesis attempts exactly one sees `true`; the others see
/// `false` and must not proceed to the provider. The returned `true` is
/// durable before this function returns, so a poller can already observe
/// `generating` while the external call is still in flight.
pub fn begin_audio_generation(
    conn: &Connection,
    user_id: &str,
    story_id: &str,
    expected: AudioStatus,
) -> Result<bool, StoreError> {
    let updated = conn.execute(
        "UPDATE stories SET audio_status = 'generating'
         WHERE id = ?1 AND user_id = ?2 AND audio_status = ?3",
        params![story_id, user_id, expected.as_str()],
    )?;
    Ok(updated == 1)
}

/// Sole success path: attaches the audio reference and marks `ready` in a
/// single update.
pub fn finish_audio(
    conn: &Connection,
    user_id: &str,
    story_id: &str,
    audio_blob: &str,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE stories SET audio_status = 'ready', audio_blob = ?1
         WHERE id = ?2 AND user_id = ?3",
        params![audio_blob, story_id, user_id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound("story"));
    }
    Ok(())
}

/// Marks a failed synthesis attempt. Terminal until an explicit retry.
pub fn fail_audio(conn: &Connection, user_id: &str, story_id: &str) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE stories SET audio_status = 'error'
         WHERE id = ?1 AND user_id = ?2",
        params![story_id, user_id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound("story"));
    }
    Ok(())
}
