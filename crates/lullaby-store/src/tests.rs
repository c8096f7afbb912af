use lullaby_types::{AudioStatus, EncryptedCredential, ProviderKind};
use rusqlite::Connection;

use crate::children::{
    create_child_profile, delete_child_profile, get_child_profile, list_child_profiles,
    update_child_profile, ChildProfileUpdate, NewChildProfile,
};
use crate::presets::{
    delete_voice_preset_row, get_voice_preset, insert_voice_preset, load_owned_preset,
    NewVoicePreset,
};
use crate::stories::{
    begin_audio_generation, fail_audio, finish_audio, get_story, insert_story,
    list_favorite_stories, list_stories_for_child, list_story_titles, toggle_favorite, NewStory,
};
use crate::users::{create_user, credential_status, get_user_by_token, set_credential};
use crate::StoreError;

fn setup_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    lullaby_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn sample_child() -> NewChildProfile {
    NewChildProfile {
        name: "Mia".to_string(),
        age: 5,
        interests: "dinosaurs".to_string(),
    }
}

fn sample_story(child_id: Option<String>) -> NewStory {
    NewStory {
        child_id,
        child_name: "Mia".to_string(),
        title: "The Lonely Stegosaurus".to_string(),
        content: "Once upon a time...".to_string(),
        voice_preset_id: None,
        voice_name: "Grandma".to_string(),
        voice_description: Some("A warm, gentle grandmother".to_string()),
    }
}

#[test]
fn user_tokens_resolve_and_credentials_round_trip() {
    let conn = setup_conn();
    let user = create_user(&conn, "parent@example.com").unwrap();

    let found = get_user_by_token(&conn, &user.auth_token).unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert!(get_user_by_token(&conn, "bogus").unwrap().is_none());

    let status = credential_status(&conn, &user.id).unwrap();
    assert!(!status.text);
    assert!(!status.speech);

    let cred = EncryptedCredential {
        ciphertext: vec![1, 2, 3],
        nonce: vec![0; 12],
    };
    set_credential(&conn, &user.id, ProviderKind::Speech, &cred).unwrap();

    let status = credential_status(&conn, &user.id).unwrap();
    assert!(!status.text);
    assert!(status.speech);

    let reloaded = get_user_by_token(&conn, &user.auth_token).unwrap().unwrap();
    assert_eq!(reloaded.speech_credential, Some(cred));
    assert!(reloaded.text_credential.is_none());
}

#[test]
fn child_profile_reads_degrade_for_non_owner() {
    let conn = setup_conn();
    let owner = create_user(&conn, "owner@example.com").unwrap();
    let other = create_user(&conn, "other@example.com").unwrap();

    let child = create_child_profile(&conn, &owner.id, &sample_child()).unwrap();

    assert!(get_child_profile(&conn, &owner.id, &child.id)
        .unwrap()
        .is_some());
    assert!(get_child_profile(&conn, &other.id, &child.id)
        .unwrap()
        .is_none());
    assert!(list_child_profiles(&conn, &other.id).unwrap().is_empty());
}

#[test]
fn child_profile_mutations_by_non_owner_are_unauthorized() {
    let conn = setup_conn();
    let owner = create_user(&conn, "owner@example.com").unwrap();
    let other = create_user(&conn, "other@example.com").unwrap();

    let child = create_child_profile(&conn, &owner.id, &sample_child()).unwrap();

    let update = ChildProfileUpdate {
        age: Some(6),
        ..Default::default()
    };
    let err = update_child_profile(&conn, &other.id, &child.id, &update).unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));

    let err = delete_child_profile(&conn, &other.id, &child.id).unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));

    let err = delete_child_profile(&conn, &owner.id, "missing").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    update_child_profile(&conn, &owner.id, &child.id, &update).unwrap();
    let reloaded = get_child_profile(&conn, &owner.id, &child.id)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.age, 6);
    assert_eq!(reloaded.name, "Mia", "unset fields stay untouched");
}

#[test]
fn story_keeps_child_name_after_profile_deletion() {
    let conn = setup_conn();
    let user = create_user(&conn, "parent@example.com").unwrap();
    let child = create_child_profile(&conn, &user.id, &sample_child()).unwrap();

    let story = insert_story(&conn, &user.id, &sample_story(Some(child.id.clone()))).unwrap();
    assert_eq!(story.audio_status, AudioStatus::Pending);
    assert_eq!(story.child_name, "Mia");
    assert!(!story.is_favorite);

    delete_child_profile(&conn, &user.id, &child.id).unwrap();

    let reloaded = get_story(&conn, &user.id, &story.id).unwrap().unwrap();
    assert_eq!(reloaded.child_name, "Mia");
    assert_eq!(reloaded.child_id, None, "FK cleared, snapshot retained");
}

#[test]
fn stories_by_child_empty_for_non_owner() {
    let conn = setup_conn();
    let owner = create_user(&conn, "owner@example.com").unwrap();
    let other = create_user(&conn, "other@example.com").unwrap();
    let child = create_child_profile(&conn, &owner.id, &sample_child()).unwrap();
    insert_story(&conn, &owner.id, &sample_story(Some(child.id.clone()))).unwrap();

    let own = list_stories_for_child(&conn, &owner.id, &child.id).unwrap();
    assert_eq!(own.len(), 1);

    let foreign = list_stories_for_child(&conn, &other.id, &child.id).unwrap();
    assert!(foreign.is_empty());
}

#[test]
fn favorites_toggle_and_filter() {
    let conn = setup_conn();
    let user = create_user(&conn, "parent@example.com").unwrap();
    let other = create_user(&conn, "other@example.com").unwrap();

    let story = insert_story(&conn, &user.id, &sample_story(None)).unwrap();
    insert_story(&conn, &user.id, &sample_story(None)).unwrap();

    assert!(toggle_favorite(&conn, &user.id, &story.id).unwrap());
    let favorites = list_favorite_stories(&conn, &user.id).unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, story.id);

    assert!(!toggle_favorite(&conn, &user.id, &story.id).unwrap());
    assert!(list_favorite_stories(&conn, &user.id).unwrap().is_empty());

    let err = toggle_favorite(&conn, &other.id, &story.id).unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));
}

#[test]
fn title_history_collects_all_titles() {
    let conn = setup_conn();
    let user = create_user(&conn, "parent@example.com").unwrap();

    let mut story = sample_story(None);
    insert_story(&conn, &user.id, &story).unwrap();
    story.title = "The Sleepy Comet".to_string();
    insert_story(&conn, &user.id, &story).unwrap();

    let titles = list_story_titles(&conn, &user.id).unwrap();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"The Lonely Stegosaurus".to_string()));
    assert!(titles.contains(&"The Sleepy Comet".to_string()));
}

#[test]
fn audio_transition_has_single_winner() {
    let conn = setup_conn();
    let user = create_user(&conn, "parent@example.com").unwrap();
    let story = insert_story(&conn, &user.id, &sample_story(None)).unwrap();

    // First caller wins the pending -> generating transition.
    assert!(begin_audio_generation(&conn, &user.id, &story.id, AudioStatus::Pending).unwrap());
    // A concurrent caller that also observed `pending` loses.
    assert!(!begin_audio_generation(&conn, &user.id, &story.id, AudioStatus::Pending).unwrap());

    let current = get_story(&conn, &user.id, &story.id).unwrap().unwrap();
    assert_eq!(current.audio_status, AudioStatus::Generating);

    finish_audio(&conn, &user.id, &story.id, "blob-1.wav").unwrap();
    let ready = get_story(&conn, &user.id, &story.id).unwrap().unwrap();
    assert_eq!(ready.audio_status, AudioStatus::Ready);
    assert_eq!(ready.audio_blob.as_deref(), Some("blob-1.wav"));

    // Explicit retry from ready re-enters generating, then fails.
    assert!(begin_audio_generation(&conn, &user.id, &story.id, AudioStatus::Ready).unwrap());
    fail_audio(&conn, &user.id, &story.id).unwrap();
    let errored = get_story(&conn, &user.id, &story.id).unwrap().unwrap();
    assert_eq!(errored.audio_status, AudioStatus::Error);

    // Retry from error passes through generating again.
    assert!(begin_audio_generation(&conn, &user.id, &story.id, AudioStatus::Error).unwrap());
    let retrying = get_story(&conn, &user.id, &story.id).unwrap().unwrap();
    assert_eq!(retrying.audio_status, AudioStatus::Generating);
}

#[test]
fn preset_rows_are_owner_scoped() {
    let conn = setup_conn();
    let owner = create_user(&conn, "owner@example.com").unwrap();
    let other = create_user(&conn, "other@example.com").unwrap();

    let preset = insert_voice_preset(
        &conn,
        &owner.id,
        &NewVoicePreset {
            name: "Grandma".to_string(),
            description: "A warm, gentle grandmother".to_string(),
            provider_voice_id: "voice-123".to_string(),
            sample_blob: "sample-1.wav".to_string(),
        },
    )
    .unwrap();

    assert!(get_voice_preset(&conn, &other.id, &preset.id)
        .unwrap()
        .is_none());

    let err = load_owned_preset(&conn, &other.id, &preset.id).unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));

    let err = delete_voice_preset_row(&conn, &other.id, &preset.id).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    delete_voice_preset_row(&conn, &owner.id, &preset.id).unwrap();
    assert!(get_voice_preset(&conn, &owner.id, &preset.id)
        .unwrap()
        .is_none());
}
