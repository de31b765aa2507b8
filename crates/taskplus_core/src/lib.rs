//! Core domain logic for TaskPlus.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;
pub mod store;
pub mod timestamp;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogLevel,
};
pub use model::note::{NewNote, Note, NotePatch, PhotoRef};
pub use model::preferences::{PreferencesPatch, UserPreferences};
pub use model::task::{Category, NewTask, Priority, Task, TaskPatch};
pub use model::EntityValidationError;
pub use repo::note_repo::{NoteRepository, StoreNoteRepository};
pub use repo::preferences_repo::{PreferencesRepository, StorePreferencesRepository};
pub use repo::task_repo::{StoreTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::note_service::NoteService;
pub use service::preferences_service::{
    PreferenceBroadcaster, PreferenceChange, PreferencesService, SubscriptionId,
};
pub use service::task_service::TaskService;
pub use session::{
    AuthError, AuthErrorCode, Identity, IdentityProvider, SessionManager, SqliteIdentityProvider,
};
pub use store::{Collection, Document, DocumentId, DocumentStore, SqliteDocumentStore, StoreError};
pub use timestamp::{from_store_timestamp, to_store_timestamp, DateInput, StoreTimestamp};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
