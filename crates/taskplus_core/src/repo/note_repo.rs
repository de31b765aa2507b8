//! Note repository contract and document-store implementation.

use super::{decode_listing, not_found, traced, RepoError, RepoResult};
use crate::model::note::{NewNote, Note, NotePatch, PhotoRef, PHOTO};
use crate::model::{fields, require_owner};
use crate::store::{Collection, Document, DocumentId, DocumentStore, Fields};
use crate::timestamp::StoreTimestamp;
use chrono::Utc;
use serde_json::Value;

const COLLECTION: Collection = Collection::Notes;

/// Repository interface for note CRUD operations.
pub trait NoteRepository {
    fn create_note(&self, owner_id: &str, note: &NewNote) -> RepoResult<Note>;
    fn list_notes(&self, owner_id: &str) -> RepoResult<Vec<Note>>;
    fn update_note(&self, id: &DocumentId, patch: &NotePatch) -> RepoResult<Note>;
    fn delete_note(&self, id: &DocumentId) -> RepoResult<()>;
    fn get_note(&self, id: &DocumentId) -> RepoResult<Option<Note>>;
}

/// Note repository backed by any `DocumentStore`.
pub struct StoreNoteRepository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StoreNoteRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn create(&self, owner_id: &str, note: &NewNote) -> RepoResult<Note> {
        require_owner(owner_id)?;
        note.validate()?;

        let mut body = Fields::new();
        body.insert(fields::USER_ID.into(), owner_id.into());
        body.insert("title".into(), note.title.clone().into());
        body.insert("content".into(), note.content.clone().into());
        if let Some(photo) = &note.photo {
            body.insert(PHOTO.into(), photo_value(photo));
        }
        body.insert(fields::CREATED_AT.into(), StoreTimestamp::now().to_value());

        let id = self.store.add(COLLECTION, body.clone())?;
        decode(&Document { id, fields: body })
    }

    fn update(&self, id: &DocumentId, patch: &NotePatch) -> RepoResult<Note> {
        patch.validate()?;
        let existing = self
            .store
            .get(COLLECTION, id)?
            .ok_or_else(|| not_found(COLLECTION, id))?;
        let mut merged = decode(&existing)?;

        let now = Utc::now();
        let mut body = Fields::new();
        if let Some(title) = &patch.title {
            body.insert("title".into(), title.clone().into());
            merged.title = title.clone();
        }
        if let Some(content) = &patch.content {
            body.insert("content".into(), content.clone().into());
            merged.content = content.clone();
        }
        if let Some(photo) = &patch.photo {
            body.insert(PHOTO.into(), photo_value(photo));
            merged.photo = Some(photo.clone());
        }
        body.insert(
            fields::UPDATED_AT.into(),
            StoreTimestamp::from_instant(now).to_value(),
        );
        merged.updated_at = Some(now);

        self.store.update(COLLECTION, id, body)?;
        Ok(merged)
    }

    fn delete(&self, id: &DocumentId) -> RepoResult<()> {
        if self.store.get(COLLECTION, id)?.is_none() {
            return Err(not_found(COLLECTION, id));
        }
        self.store.delete(COLLECTION, id)?;
        Ok(())
    }
}

impl<S: DocumentStore> NoteRepository for StoreNoteRepository<S> {
    fn create_note(&self, owner_id: &str, note: &NewNote) -> RepoResult<Note> {
        traced("note_create", self.create(owner_id, note))
    }

    fn list_notes(&self, owner_id: &str) -> RepoResult<Vec<Note>> {
        let result = require_owner(owner_id)
            .map_err(RepoError::from)
            .and_then(|()| Ok(self.store.query_eq(COLLECTION, fields::USER_ID, owner_id)?))
            .map(|documents| decode_listing("note_list", &documents, decode));
        traced("note_list", result)
    }

    fn update_note(&self, id: &DocumentId, patch: &NotePatch) -> RepoResult<Note> {
        traced("note_update", self.update(id, patch))
    }

    fn delete_note(&self, id: &DocumentId) -> RepoResult<()> {
        traced("note_delete", self.delete(id))
    }

    fn get_note(&self, id: &DocumentId) -> RepoResult<Option<Note>> {
        let result = self
            .store
            .get(COLLECTION, id)
            .map_err(RepoError::from)
            .and_then(|document| document.as_ref().map(decode).transpose());
        traced("note_get", result)
    }
}

fn photo_value(photo: &PhotoRef) -> Value {
    serde_json::json!({ "uri": photo.uri })
}

fn decode(document: &Document) -> RepoResult<Note> {
    Note::from_document(document).map_err(RepoError::InvalidData)
}
