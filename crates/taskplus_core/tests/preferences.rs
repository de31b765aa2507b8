use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;
use taskplus_core::db::open_db_in_memory;
use taskplus_core::{
    PreferenceBroadcaster, PreferenceChange, PreferencesPatch, PreferencesRepository,
    PreferencesService, RepoError, SqliteDocumentStore, StorePreferencesRepository,
};

#[test]
fn second_upsert_keeps_created_at() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repo = StorePreferencesRepository::new(&store);

    let first = repo
        .set_preferences("u1", &PreferencesPatch::dark_mode(true))
        .unwrap();
    assert!(first.dark_mode);
    assert!(first.created_at.is_some());
    assert_eq!(first.updated_at, None);

    sleep(Duration::from_millis(5));
    let second = repo
        .set_preferences("u1", &PreferencesPatch::dark_mode(true))
        .unwrap();
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at.is_some());

    let stored = repo.get_preferences("u1").unwrap().unwrap();
    assert_eq!(stored.owner_id(), "u1");
    assert!(stored.dark_mode);
    assert_eq!(stored.created_at, first.created_at);
}

#[test]
fn empty_patch_creates_with_dark_mode_off() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repo = StorePreferencesRepository::new(&store);

    assert!(repo.get_preferences("u1").unwrap().is_none());
    let created = repo
        .set_preferences("u1", &PreferencesPatch::default())
        .unwrap();
    assert!(!created.dark_mode);
}

#[test]
fn owner_id_must_be_a_usable_key() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repo = StorePreferencesRepository::new(&store);

    for owner in ["", "a/b"] {
        let err = repo
            .set_preferences(owner, &PreferencesPatch::dark_mode(true))
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}

#[test]
fn delete_preferences_follows_not_found_rules() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repo = StorePreferencesRepository::new(&store);

    assert!(repo.delete_preferences("u1").unwrap_err().is_not_found());
    repo.set_preferences("u1", &PreferencesPatch::dark_mode(false))
        .unwrap();
    repo.delete_preferences("u1").unwrap();
    assert!(repo.get_preferences("u1").unwrap().is_none());
}

#[test]
fn writes_notify_live_subscribers_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let broadcaster = Arc::new(PreferenceBroadcaster::new());
    let service = PreferencesService::with_broadcaster(
        StorePreferencesRepository::new(&store),
        Arc::clone(&broadcaster),
    );

    let seen_a = Arc::new(Mutex::new(Vec::<PreferenceChange>::new()));
    let seen_b = Arc::new(Mutex::new(Vec::<PreferenceChange>::new()));
    let sink_a = Arc::clone(&seen_a);
    let sink_b = Arc::clone(&seen_b);
    broadcaster.subscribe(move |change| sink_a.lock().unwrap().push(change.clone()));
    let id_b = broadcaster.subscribe(move |change| sink_b.lock().unwrap().push(change.clone()));

    service.set_dark_mode("u1", true).unwrap();
    assert!(broadcaster.unsubscribe(id_b));
    assert!(!broadcaster.unsubscribe(id_b));
    service.toggle_dark_mode("u1").unwrap();

    let expected_first = PreferenceChange {
        owner_id: "u1".to_string(),
        dark_mode: true,
    };
    let expected_second = PreferenceChange {
        owner_id: "u1".to_string(),
        dark_mode: false,
    };
    assert_eq!(
        *seen_a.lock().unwrap(),
        vec![expected_first.clone(), expected_second]
    );
    assert_eq!(*seen_b.lock().unwrap(), vec![expected_first]);
    assert!(!service.dark_mode_enabled("u1").unwrap());
    assert_eq!(broadcaster.subscriber_count(), 1);
}

#[test]
fn failed_writes_publish_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let broadcaster = Arc::new(PreferenceBroadcaster::new());
    let service = PreferencesService::with_broadcaster(
        StorePreferencesRepository::new(&store),
        Arc::clone(&broadcaster),
    );
    let calls = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&calls);
    broadcaster.subscribe(move |_| *counter.lock().unwrap() += 1);

    assert!(service.set_dark_mode("", true).is_err());
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn global_broadcaster_is_shared() {
    let first = PreferenceBroadcaster::global();
    let second = PreferenceBroadcaster::global();
    assert!(Arc::ptr_eq(&first, &second));
}
