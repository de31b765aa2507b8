//! Note use-case service.
//!
//! # Invariants
//! - Titles are trimmed before they reach the repository.
//! - `list_notes` returns newest `createdAt` first; notes without a
//!   creation timestamp sort last.
//! - `*_owned` operations refuse notes of other owners.

use crate::model::note::{NewNote, Note, NotePatch};
use crate::repo::note_repo::NoteRepository;
use crate::repo::{check_owner, not_found, RepoResult};
use crate::store::{Collection, DocumentId};
use std::cmp::Reverse;

/// Use-case service wrapper for note operations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_note(&self, owner_id: &str, note: NewNote) -> RepoResult<Note> {
        let mut note = note;
        note.title = note.title.trim().to_string();
        self.repo.create_note(owner_id, &note)
    }

    pub fn list_notes(&self, owner_id: &str) -> RepoResult<Vec<Note>> {
        let mut notes = self.repo.list_notes(owner_id)?;
        notes.sort_by_key(|note| Reverse(note.created_at));
        Ok(notes)
    }

    pub fn update_note(&self, id: &DocumentId, patch: NotePatch) -> RepoResult<Note> {
        let mut patch = patch;
        patch.title = patch.title.map(|title| title.trim().to_string());
        self.repo.update_note(id, &patch)
    }

    pub fn update_note_owned(
        &self,
        owner_id: &str,
        id: &DocumentId,
        patch: NotePatch,
    ) -> RepoResult<Note> {
        self.owned_note(owner_id, id)?;
        self.update_note(id, patch)
    }

    pub fn delete_note_owned(&self, owner_id: &str, id: &DocumentId) -> RepoResult<()> {
        self.owned_note(owner_id, id)?;
        self.repo.delete_note(id)
    }

    fn owned_note(&self, owner_id: &str, id: &DocumentId) -> RepoResult<Note> {
        let note = self
            .repo
            .get_note(id)?
            .ok_or_else(|| not_found(Collection::Notes, id))?;
        check_owner(Collection::Notes, id, &note.owner_id, owner_id)?;
        Ok(note)
    }

    pub fn get_note(&self, id: &DocumentId) -> RepoResult<Option<Note>> {
        self.repo.get_note(id)
    }

    pub fn delete_note(&self, id: &DocumentId) -> RepoResult<()> {
        self.repo.delete_note(id)
    }
}
