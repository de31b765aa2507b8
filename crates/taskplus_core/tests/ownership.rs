use taskplus_core::db::open_db_in_memory;
use taskplus_core::{
    DocumentId, NewNote, NewTask, NoteService, NotePatch, SqliteDocumentStore,
    StoreNoteRepository, StoreTaskRepository, TaskPatch, TaskService,
};

#[test]
fn tasks_of_another_owner_cannot_be_changed() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(StoreTaskRepository::new(&store));
    let task = service.create_task("alice", NewTask::new("Taxes")).unwrap();

    let err = service
        .toggle_completed_owned("mallory", task.id())
        .unwrap_err();
    assert!(err.is_not_owned());

    let err = service
        .update_task_owned("mallory", task.id(), &TaskPatch::completed(true))
        .unwrap_err();
    assert!(err.is_not_owned());

    let err = service.delete_task_owned("mallory", task.id()).unwrap_err();
    assert!(err.is_not_owned());

    let stored = service.get_task(task.id()).unwrap().unwrap();
    assert_eq!(stored.title, "Taxes");
    assert!(!stored.completed);
}

#[test]
fn owner_can_change_own_tasks() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(StoreTaskRepository::new(&store));
    let task = service.create_task("alice", NewTask::new("Taxes")).unwrap();

    assert!(service
        .toggle_completed_owned("alice", task.id())
        .unwrap()
        .completed);
    let renamed = service
        .update_task_owned(
            "alice",
            task.id(),
            &TaskPatch {
                title: Some("File taxes".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.title, "File taxes");

    service.delete_task_owned("alice", task.id()).unwrap();
    assert!(service.get_task(task.id()).unwrap().is_none());

    let missing = DocumentId::parse("missing").unwrap();
    assert!(service
        .delete_task_owned("alice", &missing)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn notes_of_another_owner_cannot_be_changed() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = NoteService::new(StoreNoteRepository::new(&store));
    let note = service
        .create_note("alice", NewNote::new("Diary", "private"))
        .unwrap();

    let patch = NotePatch {
        content: Some("defaced".to_string()),
        ..NotePatch::default()
    };
    let err = service
        .update_note_owned("mallory", note.id(), patch.clone())
        .unwrap_err();
    assert!(err.is_not_owned());
    assert!(service
        .delete_note_owned("mallory", note.id())
        .unwrap_err()
        .is_not_owned());

    let stored = service.get_note(note.id()).unwrap().unwrap();
    assert_eq!(stored.content, "private");

    let updated = service.update_note_owned("alice", note.id(), patch).unwrap();
    assert_eq!(updated.content, "defaced");
    service.delete_note_owned("alice", note.id()).unwrap();
    assert!(service.get_note(note.id()).unwrap().is_none());
}
