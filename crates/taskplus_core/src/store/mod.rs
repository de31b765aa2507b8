//! Document store boundary.
//!
//! # Responsibility
//! - Model the remote key-document store the repositories talk to.
//! - Keep backend details (SQLite, network client, ...) behind one trait.
//!
//! # Invariants
//! - Document keys are assigned by the store on `add` and never derived from
//!   document bodies.
//! - Every call is one round trip; implementations do not retry.
//! - `update` fails with `NotFound` for a missing key; `delete` of a missing
//!   key succeeds silently.

use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite_store;

pub use sqlite_store::SqliteDocumentStore;

/// Schema-less document body: top-level field name to JSON value.
pub type Fields = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// The three collections the application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Tasks,
    Notes,
    UserPreferences,
}

impl Collection {
    /// Collection name as persisted by the store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Notes => "notes",
            Self::UserPreferences => "userPreferences",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque store-assigned document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    /// Accepts a caller-held key (for example one echoed back by a UI).
    ///
    /// Returns `None` for empty keys or keys containing `/`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_store(value: String) -> Self {
        Self(value)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

/// Errors surfaced by document store round trips.
#[derive(Debug)]
pub enum StoreError {
    /// Backend transport/storage failure. Callers see it unchanged.
    Backend(Box<dyn Error + Send + Sync>),
    NotFound {
        collection: Collection,
        id: DocumentId,
    },
    InvalidDocument(String),
    InvalidFieldPath(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl StoreError {
    pub fn backend(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "document store failure: {err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::InvalidDocument(message) => write!(f, "invalid stored document: {message}"),
            Self::InvalidFieldPath(field) => write!(f, "invalid query field `{field}`"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::backend(value)
    }
}

/// Round-trip contract of the remote document store.
pub trait DocumentStore {
    /// Creates a document under a fresh store-assigned key.
    fn add(&self, collection: Collection, fields: Fields) -> StoreResult<DocumentId>;
    /// Creates or fully overwrites the document at `id`.
    fn set(&self, collection: Collection, id: &DocumentId, fields: Fields) -> StoreResult<()>;
    /// Fetches one document; `None` when the key does not exist.
    fn get(&self, collection: Collection, id: &DocumentId) -> StoreResult<Option<Document>>;
    /// Replaces the given top-level fields, keeping all others.
    fn update(&self, collection: Collection, id: &DocumentId, fields: Fields) -> StoreResult<()>;
    /// Removes the document at `id`.
    fn delete(&self, collection: Collection, id: &DocumentId) -> StoreResult<()>;
    /// Returns every document whose string field `field` equals `value`.
    fn query_eq(&self, collection: Collection, field: &str, value: &str)
        -> StoreResult<Vec<Document>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn add(&self, collection: Collection, fields: Fields) -> StoreResult<DocumentId> {
        (**self).add(collection, fields)
    }

    fn set(&self, collection: Collection, id: &DocumentId, fields: Fields) -> StoreResult<()> {
        (**self).set(collection, id, fields)
    }

    fn get(&self, collection: Collection, id: &DocumentId) -> StoreResult<Option<Document>> {
        (**self).get(collection, id)
    }

    fn update(&self, collection: Collection, id: &DocumentId, fields: Fields) -> StoreResult<()> {
        (**self).update(collection, id, fields)
    }

    fn delete(&self, collection: Collection, id: &DocumentId) -> StoreResult<()> {
        (**self).delete(collection, id)
    }

    fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        (**self).query_eq(collection, field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, DocumentId};

    #[test]
    fn collection_names_match_persisted_names() {
        assert_eq!(Collection::Tasks.as_str(), "tasks");
        assert_eq!(Collection::Notes.as_str(), "notes");
        assert_eq!(Collection::UserPreferences.as_str(), "userPreferences");
    }

    #[test]
    fn document_id_parse_rejects_empty_and_paths() {
        assert!(DocumentId::parse("").is_none());
        assert!(DocumentId::parse("   ").is_none());
        assert!(DocumentId::parse("tasks/abc").is_none());
        assert_eq!(DocumentId::parse(" abc ").unwrap().as_str(), "abc");
    }
}
