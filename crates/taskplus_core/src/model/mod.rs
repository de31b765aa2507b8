//! Entity models for tasks, notes and user preferences.
//!
//! # Responsibility
//! - Define typed entities decoded from store documents.
//! - Define creation payloads and partial-update patches.
//!
//! # Invariants
//! - Entity identifiers are private and set only from a store `Document`.
//! - Payload and patch types carry no identifier; a client `id` key in JSON
//!   ingress is ignored.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod note;
pub mod preferences;
pub mod task;

/// Persisted field names shared by every collection.
pub(crate) mod fields {
    pub const USER_ID: &str = "userId";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Validation failures for entity payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    /// Title is empty after trimming.
    EmptyTitle { entity: &'static str },
    /// Owner identifier is empty or not usable as a document key.
    InvalidOwnerId(String),
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle { entity } => write!(f, "{entity} title must not be empty"),
            Self::InvalidOwnerId(value) => write!(f, "invalid owner id `{value}`"),
        }
    }
}

impl Error for EntityValidationError {}

pub(crate) fn require_title(
    entity: &'static str,
    title: &str,
) -> Result<(), EntityValidationError> {
    if title.trim().is_empty() {
        return Err(EntityValidationError::EmptyTitle { entity });
    }
    Ok(())
}

pub(crate) fn require_owner(owner_id: &str) -> Result<(), EntityValidationError> {
    if owner_id.trim().is_empty() {
        return Err(EntityValidationError::InvalidOwnerId(owner_id.to_string()));
    }
    Ok(())
}
