//! User preferences repository.
//!
//! # Invariants
//! - The owner identifier is the document key; one document per user.
//! - `set_preferences` is a read-then-write upsert without concurrency
//!   control: the last write wins.
//! - `createdAt` is written on the first upsert only.

use super::{not_found, traced, RepoError, RepoResult};
use crate::model::preferences::{PreferencesPatch, UserPreferences, DARK_MODE};
use crate::model::{fields, EntityValidationError};
use crate::store::{Collection, Document, DocumentId, DocumentStore, Fields};
use crate::timestamp::StoreTimestamp;
use chrono::Utc;
use serde_json::Value;

const COLLECTION: Collection = Collection::UserPreferences;

/// Repository interface for per-user preferences.
pub trait PreferencesRepository {
    fn get_preferences(&self, owner_id: &str) -> RepoResult<Option<UserPreferences>>;
    /// Partially updates existing preferences or creates them.
    fn set_preferences(
        &self,
        owner_id: &str,
        patch: &PreferencesPatch,
    ) -> RepoResult<UserPreferences>;
    fn delete_preferences(&self, owner_id: &str) -> RepoResult<()>;
}

/// Preferences repository backed by any `DocumentStore`.
pub struct StorePreferencesRepository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StorePreferencesRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn get(&self, owner_id: &str) -> RepoResult<Option<UserPreferences>> {
        let key = owner_key(owner_id)?;
        self.store
            .get(COLLECTION, &key)?
            .as_ref()
            .map(decode)
            .transpose()
    }

    fn upsert(&self, owner_id: &str, patch: &PreferencesPatch) -> RepoResult<UserPreferences> {
        let key = owner_key(owner_id)?;

        match self.store.get(COLLECTION, &key)? {
            Some(existing) => {
                let mut merged = decode(&existing)?;
                let now = Utc::now();
                let mut body = Fields::new();
                if let Some(dark_mode) = patch.dark_mode {
                    body.insert(DARK_MODE.into(), Value::Bool(dark_mode));
                    merged.dark_mode = dark_mode;
                }
                body.insert(
                    fields::UPDATED_AT.into(),
                    StoreTimestamp::from_instant(now).to_value(),
                );
                merged.updated_at = Some(now);

                self.store.update(COLLECTION, &key, body)?;
                Ok(merged)
            }
            None => {
                let mut body = Fields::new();
                body.insert(
                    DARK_MODE.into(),
                    Value::Bool(patch.dark_mode.unwrap_or(false)),
                );
                body.insert(fields::CREATED_AT.into(), StoreTimestamp::now().to_value());

                self.store.set(COLLECTION, &key, body.clone())?;
                decode(&Document {
                    id: key,
                    fields: body,
                })
            }
        }
    }

    fn delete(&self, owner_id: &str) -> RepoResult<()> {
        let key = owner_key(owner_id)?;
        if self.store.get(COLLECTION, &key)?.is_none() {
            return Err(not_found(COLLECTION, &key));
        }
        self.store.delete(COLLECTION, &key)?;
        Ok(())
    }
}

impl<S: DocumentStore> PreferencesRepository for StorePreferencesRepository<S> {
    fn get_preferences(&self, owner_id: &str) -> RepoResult<Option<UserPreferences>> {
        traced("preferences_get", self.get(owner_id))
    }

    fn set_preferences(
        &self,
        owner_id: &str,
        patch: &PreferencesPatch,
    ) -> RepoResult<UserPreferences> {
        traced("preferences_set", self.upsert(owner_id, patch))
    }

    fn delete_preferences(&self, owner_id: &str) -> RepoResult<()> {
        traced("preferences_delete", self.delete(owner_id))
    }
}

fn owner_key(owner_id: &str) -> RepoResult<DocumentId> {
    DocumentId::parse(owner_id)
        .ok_or_else(|| EntityValidationError::InvalidOwnerId(owner_id.to_string()).into())
}

fn decode(document: &Document) -> RepoResult<UserPreferences> {
    UserPreferences::from_document(document).map_err(RepoError::InvalidData)
}
