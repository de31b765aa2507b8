//! Task entity, creation payload and patch.
//!
//! # Invariants
//! - `due_date`, when present, is a valid instant.
//! - Absent category decodes as `Category::NoCategory`, absent priority as
//!   `Priority::Medium`, absent completed flag as `false`.

use super::{fields, require_title, EntityValidationError};
use crate::store::{Document, DocumentId};
use crate::timestamp::{instant_from_field, DateInput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const DUE_DATE: &str = "dueDate";

/// Fixed task category set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    #[default]
    NoCategory,
    Work,
    Personal,
    Shopping,
    Health,
    Education,
    Finance,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::NoCategory,
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Education,
        Category::Finance,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCategory => "noCategory",
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Shopping => "shopping",
            Self::Health => "health",
            Self::Education => "education",
            Self::Finance => "finance",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Task as read from the `tasks` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: DocumentId,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Category,
    pub priority: Priority,
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDocument {
    user_id: String,
    title: String,
    description: Option<String>,
    due_date: Option<Value>,
    category: Option<Category>,
    priority: Option<Priority>,
    completed: Option<bool>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

impl Task {
    /// Store-assigned identifier.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Decodes a `tasks` document.
    ///
    /// The document key is authoritative; an `id` key in the body is
    /// ignored. Malformed dates are dropped, other shape errors are returned.
    pub(crate) fn from_document(document: &Document) -> Result<Self, String> {
        let decoded: TaskDocument =
            serde_json::from_value(Value::Object(document.fields.clone()))
                .map_err(|err| format!("tasks/{}: {err}", document.id))?;

        Ok(Self {
            id: document.id.clone(),
            owner_id: decoded.user_id,
            title: decoded.title,
            description: decoded.description,
            due_date: decoded
                .due_date
                .and_then(|value| instant_from_field(DUE_DATE, &value)),
            category: decoded.category.unwrap_or_default(),
            priority: decoded.priority.unwrap_or_default(),
            completed: decoded.completed.unwrap_or(false),
            created_at: decoded
                .created_at
                .and_then(|value| instant_from_field(fields::CREATED_AT, &value)),
            updated_at: decoded
                .updated_at
                .and_then(|value| instant_from_field(fields::UPDATED_AT, &value)),
        })
    }
}

/// Creation payload for a task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateInput>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<DateInput>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        require_title("task", &self.title)
    }
}

/// Partial update for a task; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateInput>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        match self.title.as_deref() {
            Some(title) => require_title("task", title),
            None => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(body: Value) -> Document {
        let Value::Object(fields) = body else {
            unreachable!("fixtures are objects")
        };
        Document {
            id: DocumentId::from_store("doc-1".to_string()),
            fields,
        }
    }

    #[test]
    fn decode_applies_defaults() {
        let task = Task::from_document(&document(json!({
            "userId": "u1",
            "title": "Buy milk",
        })))
        .unwrap();

        assert_eq!(task.category, Category::NoCategory);
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert!(task.due_date.is_none());
    }

    #[test]
    fn decode_prefers_document_key_over_body_id() {
        let task = Task::from_document(&document(json!({
            "id": "client-side-id",
            "userId": "u1",
            "title": "t",
        })))
        .unwrap();
        assert_eq!(task.id().as_str(), "doc-1");
    }

    #[test]
    fn decode_drops_malformed_due_date() {
        let task = Task::from_document(&document(json!({
            "userId": "u1",
            "title": "t",
            "dueDate": "not a date",
        })))
        .unwrap();
        assert!(task.due_date.is_none());
    }

    #[test]
    fn decode_rejects_unknown_category() {
        let err = Task::from_document(&document(json!({
            "userId": "u1",
            "title": "t",
            "category": "gardening",
        })))
        .unwrap_err();
        assert!(err.contains("tasks/doc-1"));
    }

    #[test]
    fn new_task_ingress_ignores_client_id() {
        let payload: NewTask = serde_json::from_value(json!({
            "id": "spoofed",
            "title": "x",
            "dueDate": { "__type": "Date", "iso": "2024-05-01T00:00:00.000Z" },
        }))
        .unwrap();
        assert_eq!(payload.title, "x");
        assert!(matches!(payload.due_date, Some(DateInput::Wrapped(_))));
    }

    #[test]
    fn category_round_trips_through_names() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
    }
}
