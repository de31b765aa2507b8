//! Task repository contract and document-store implementation.

use super::{decode_listing, not_found, traced, RepoError, RepoResult};
use crate::model::task::{NewTask, Task, TaskPatch, DUE_DATE};
use crate::model::{fields, require_owner};
use crate::store::{Collection, Document, DocumentId, DocumentStore, Fields};
use crate::timestamp::{to_store_timestamp, StoreTimestamp};
use chrono::Utc;
use serde_json::Value;

const COLLECTION: Collection = Collection::Tasks;

/// Repository interface for task CRUD operations.
pub trait TaskRepository {
    /// Creates a task owned by `owner_id` and returns it with its new id.
    fn create_task(&self, owner_id: &str, task: &NewTask) -> RepoResult<Task>;
    /// Lists every task owned by `owner_id`; order is unspecified.
    fn list_tasks(&self, owner_id: &str) -> RepoResult<Vec<Task>>;
    /// Applies a partial update and returns the merged view.
    fn update_task(&self, id: &DocumentId, patch: &TaskPatch) -> RepoResult<Task>;
    /// Permanently removes a task.
    fn delete_task(&self, id: &DocumentId) -> RepoResult<()>;
    /// Gets one task; `None` when it does not exist.
    fn get_task(&self, id: &DocumentId) -> RepoResult<Option<Task>>;
}

/// Task repository backed by any `DocumentStore`.
pub struct StoreTaskRepository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StoreTaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn create(&self, owner_id: &str, task: &NewTask) -> RepoResult<Task> {
        require_owner(owner_id)?;
        task.validate()?;

        let mut body = Fields::new();
        body.insert(fields::USER_ID.into(), owner_id.into());
        body.insert("title".into(), task.title.clone().into());
        if let Some(description) = &task.description {
            body.insert("description".into(), description.clone().into());
        }
        if let Some(timestamp) = task.due_date.as_ref().and_then(to_store_timestamp) {
            body.insert(DUE_DATE.into(), timestamp.to_value());
        }
        body.insert(
            "category".into(),
            task.category.unwrap_or_default().as_str().into(),
        );
        body.insert(
            "priority".into(),
            task.priority.unwrap_or_default().as_str().into(),
        );
        body.insert("completed".into(), task.completed.unwrap_or(false).into());
        body.insert(fields::CREATED_AT.into(), StoreTimestamp::now().to_value());

        let id = self.store.add(COLLECTION, body.clone())?;
        decode(&Document { id, fields: body })
    }

    fn update(&self, id: &DocumentId, patch: &TaskPatch) -> RepoResult<Task> {
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
        if let Some(description) = &patch.description {
            body.insert("description".into(), description.clone().into());
            merged.description = Some(description.clone());
        }
        if let Some(input) = &patch.due_date {
            // The merged view keeps the client's instant at full precision.
            if let Some(timestamp) = to_store_timestamp(input) {
                body.insert(DUE_DATE.into(), timestamp.to_value());
                merged.due_date = input.to_instant();
            }
        }
        if let Some(category) = patch.category {
            body.insert("category".into(), category.as_str().into());
            merged.category = category;
        }
        if let Some(priority) = patch.priority {
            body.insert("priority".into(), priority.as_str().into());
            merged.priority = priority;
        }
        if let Some(completed) = patch.completed {
            body.insert("completed".into(), Value::Bool(completed));
            merged.completed = completed;
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

impl<S: DocumentStore> TaskRepository for StoreTaskRepository<S> {
    fn create_task(&self, owner_id: &str, task: &NewTask) -> RepoResult<Task> {
        traced("task_create", self.create(owner_id, task))
    }

    fn list_tasks(&self, owner_id: &str) -> RepoResult<Vec<Task>> {
        let result = require_owner(owner_id)
            .map_err(RepoError::from)
            .and_then(|()| Ok(self.store.query_eq(COLLECTION, fields::USER_ID, owner_id)?))
            .map(|documents| decode_listing("task_list", &documents, decode));
        traced("task_list", result)
    }

    fn update_task(&self, id: &DocumentId, patch: &TaskPatch) -> RepoResult<Task> {
        traced("task_update", self.update(id, patch))
    }

    fn delete_task(&self, id: &DocumentId) -> RepoResult<()> {
        traced("task_delete", self.delete(id))
    }

    fn get_task(&self, id: &DocumentId) -> RepoResult<Option<Task>> {
        let result = self
            .store
            .get(COLLECTION, id)
            .map_err(RepoError::from)
            .and_then(|document| document.as_ref().map(decode).transpose());
        traced("task_get", result)
    }
}

fn decode(document: &Document) -> RepoResult<Task> {
    Task::from_document(document).map_err(RepoError::InvalidData)
}
