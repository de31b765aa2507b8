use taskplus_core::db::{open_db, open_db_in_memory};
use taskplus_core::{AuthErrorCode, SessionManager, SqliteIdentityProvider};

#[test]
fn register_signs_in_and_login_checks_password() {
    let conn = open_db_in_memory().unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());

    let registered = session.register("ada@example.com", "hunter22").unwrap();
    assert_eq!(registered.email, "ada@example.com");
    assert!(registered.metadata.last_sign_in_time.is_some());
    assert_eq!(
        session.current_identity().unwrap().map(|identity| identity.uid),
        Some(registered.uid.clone())
    );

    let err = session.login("ada@example.com", "wrong-pass").unwrap_err();
    assert_eq!(err.code, AuthErrorCode::WrongPassword);

    let err = session.login("nobody@example.com", "hunter22").unwrap_err();
    assert_eq!(err.code, AuthErrorCode::UserNotFound);

    let logged_in = session.login("ADA@example.com", "hunter22").unwrap();
    assert_eq!(logged_in.uid, registered.uid);
    assert_eq!(logged_in.metadata.creation_time, registered.metadata.creation_time);
}

#[test]
fn registration_rejections_use_provider_codes() {
    let conn = open_db_in_memory().unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());
    session.register("ada@example.com", "hunter22").unwrap();

    let cases = [
        ("ada@example.com", "another1", AuthErrorCode::EmailAlreadyInUse),
        ("Ada@Example.com", "another1", AuthErrorCode::EmailAlreadyInUse),
        ("not-an-email", "hunter22", AuthErrorCode::InvalidEmail),
        ("bob@example.com", "12345", AuthErrorCode::WeakPassword),
    ];
    for (email, password, code) in cases {
        let err = session.register(email, password).unwrap_err();
        assert_eq!(err.code, code, "{email}");
    }

    let err = session.login("ada@example.com", "").unwrap_err();
    assert_eq!(err.code, AuthErrorCode::InvalidCredential);
}

#[test]
fn logout_clears_session_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());

    session.logout().unwrap();
    session.register("ada@example.com", "hunter22").unwrap();
    session.logout().unwrap();
    assert!(session.current_identity().unwrap().is_none());
    session.logout().unwrap();
}

#[test]
fn signed_in_identity_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskplus.sqlite3");

    let uid = {
        let conn = open_db(&path).unwrap();
        let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());
        session.register("ada@example.com", "hunter22").unwrap().uid
    };

    let conn = open_db(&path).unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());
    let current = session.current_identity().unwrap().unwrap();
    assert_eq!(current.uid, uid);
    assert_eq!(current.email, "ada@example.com");

    session.logout().unwrap();
    drop(session);
    drop(conn);

    let conn = open_db(&path).unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());
    assert!(session.current_identity().unwrap().is_none());
}

#[test]
fn passwords_are_not_stored_in_clear() {
    let conn = open_db_in_memory().unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());
    session.register("ada@example.com", "hunter22").unwrap();

    let hash: String = conn
        .query_row("SELECT password_hash FROM accounts;", [], |row| row.get(0))
        .unwrap();
    assert!(!hash.contains("hunter22"));
    assert!(hash.starts_with("$pbkdf2-sha256$"), "{hash}");
}

#[test]
fn accounts_with_the_same_password_get_distinct_hashes() {
    let conn = open_db_in_memory().unwrap();
    let session = SessionManager::new(SqliteIdentityProvider::try_new(&conn).unwrap());
    session.register("ada@example.com", "hunter22").unwrap();
    session.register("bob@example.com", "hunter22").unwrap();

    let mut stmt = conn
        .prepare("SELECT password_hash FROM accounts ORDER BY email;")
        .unwrap();
    let hashes: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(hashes.len(), 2);
    assert_ne!(hashes[0], hashes[1]);

    session.logout().unwrap();
    assert_eq!(
        session.login("bob@example.com", "hunter22").unwrap().email,
        "bob@example.com"
    );
}
