//! Repository layer over the document store.
//!
//! # Responsibility
//! - Expose per-entity CRUD contracts scoped by owner identifier.
//! - Normalize dates on every write and every read.
//!
//! # Invariants
//! - Update and delete of a missing identifier fail with `NotFound`.
//! - Owner-scoped service calls on another owner's record fail with `NotOwned`
//!   before anything is written.
//! - Store failures propagate unchanged; repositories never retry.
//! - Returned entities always carry the store-assigned identifier.
//! - Listing skips documents that fail to decode; single reads report them.

use crate::model::EntityValidationError;
use crate::store::{Collection, Document, DocumentId, StoreError};
use log::{debug, error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod note_repo;
pub mod preferences_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntityValidationError),
    NotFound {
        collection: Collection,
        id: DocumentId,
    },
    /// The record exists but belongs to a different owner.
    NotOwned {
        collection: Collection,
        id: DocumentId,
    },
    Store(StoreError),
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_not_owned(&self) -> bool {
        matches!(self, Self::NotOwned { .. })
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::NotOwned { .. } => "not_owned",
            Self::Store(_) => "store",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => write!(f, "{collection} not found: {id}"),
            Self::NotOwned { collection, id } => {
                write!(f, "{collection} {id} belongs to another owner")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound { .. } | Self::NotOwned { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<EntityValidationError> for RepoError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { collection, id } => Self::NotFound { collection, id },
            other => Self::Store(other),
        }
    }
}

/// Logs the outcome of one repository operation and passes it through.
pub(crate) fn traced<T>(event: &'static str, result: RepoResult<T>) -> RepoResult<T> {
    match &result {
        Ok(_) => debug!("event={event} module=repo status=ok"),
        Err(err) => error!(
            "event={event} module=repo status=error error_code={} error={err}",
            err.code()
        ),
    }
    result
}

pub(crate) fn not_found(collection: Collection, id: &DocumentId) -> RepoError {
    RepoError::NotFound {
        collection,
        id: id.clone(),
    }
}

/// Rejects a record fetched for `owner_id` when it belongs to someone else.
pub(crate) fn check_owner(
    collection: Collection,
    id: &DocumentId,
    record_owner: &str,
    owner_id: &str,
) -> RepoResult<()> {
    if record_owner == owner_id {
        return Ok(());
    }
    warn!("event=owner_check module=repo status=rejected collection={collection}");
    Err(RepoError::NotOwned {
        collection,
        id: id.clone(),
    })
}

/// Decodes a listing, dropping and logging documents that fail to decode.
pub(crate) fn decode_listing<T>(
    event: &'static str,
    documents: &[Document],
    decode: impl Fn(&Document) -> RepoResult<T>,
) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match decode(document) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(
                    "event={event} module=repo status=skipped doc_id={} error={err}",
                    document.id
                );
                None
            }
        })
        .collect()
}
