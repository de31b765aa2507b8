//! Note entity, creation payload and patch.

use super::{fields, require_title, EntityValidationError};
use crate::store::{Document, DocumentId};
use crate::timestamp::instant_from_field;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const PHOTO: &str = "photo";

/// Opaque photo reference, persisted as `{ "uri": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub uri: String,
}

impl PhotoRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Older documents may hold the bare URI string.
#[derive(Deserialize)]
#[serde(untagged)]
enum PhotoField {
    Object(PhotoRef),
    Uri(String),
}

impl From<PhotoField> for PhotoRef {
    fn from(value: PhotoField) -> Self {
        match value {
            PhotoField::Object(photo) => photo,
            PhotoField::Uri(uri) => PhotoRef { uri },
        }
    }
}

/// Note as read from the `notes` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: DocumentId,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub photo: Option<PhotoRef>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteDocument {
    user_id: String,
    title: String,
    #[serde(default)]
    content: String,
    photo: Option<PhotoField>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

impl Note {
    /// Store-assigned identifier.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub(crate) fn from_document(document: &Document) -> Result<Self, String> {
        let decoded: NoteDocument =
            serde_json::from_value(Value::Object(document.fields.clone()))
                .map_err(|err| format!("notes/{}: {err}", document.id))?;

        Ok(Self {
            id: document.id.clone(),
            owner_id: decoded.user_id,
            title: decoded.title,
            content: decoded.content,
            photo: decoded.photo.map(PhotoRef::from),
            created_at: decoded
                .created_at
                .and_then(|value| instant_from_field(fields::CREATED_AT, &value)),
            updated_at: decoded
                .updated_at
                .and_then(|value| instant_from_field(fields::UPDATED_AT, &value)),
        })
    }
}

/// Creation payload for a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub photo: Option<PhotoRef>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            photo: None,
        }
    }

    pub fn with_photo(mut self, photo: PhotoRef) -> Self {
        self.photo = Some(photo);
        self
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        require_title("note", &self.title)
    }
}

/// Partial update for a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub photo: Option<PhotoRef>,
}

impl NotePatch {
    pub fn validate(&self) -> Result<(), EntityValidationError> {
        match self.title.as_deref() {
            Some(title) => require_title("note", title),
            None => Ok(()),
        }
    }
}
