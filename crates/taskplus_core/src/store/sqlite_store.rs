//! SQLite-backed document store.
//!
//! Documents live in one `documents` table keyed by `(collection, doc_id)`
//! with the body stored as JSON text. Equality queries use `json_extract`
//! on the body.

use super::{Collection, Document, DocumentId, DocumentStore, Fields, StoreError, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

/// Document store over a migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the `documents` table is absent.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn).map_err(StoreError::backend)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::MissingRequiredTable("documents"));
        }

        Ok(Self { conn })
    }

    fn load_body(&self, collection: Collection, id: &DocumentId) -> StoreResult<Option<Fields>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection.as_str(), id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|text| parse_body(collection, id, &text)).transpose()
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn add(&self, collection: Collection, fields: Fields) -> StoreResult<DocumentId> {
        let id = DocumentId::from_store(Uuid::new_v4().simple().to_string());
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
            params![collection.as_str(), id.as_str(), encode_body(fields)?],
        )?;
        debug!(
            "event=store_write module=store op=add collection={} doc_id={}",
            collection, id
        );
        Ok(id)
    }

    fn set(&self, collection: Collection, id: &DocumentId, fields: Fields) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, doc_id) DO UPDATE SET
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![collection.as_str(), id.as_str(), encode_body(fields)?],
        )?;
        debug!(
            "event=store_write module=store op=set collection={} doc_id={}",
            collection, id
        );
        Ok(())
    }

    fn get(&self, collection: Collection, id: &DocumentId) -> StoreResult<Option<Document>> {
        Ok(self.load_body(collection, id)?.map(|fields| Document {
            id: id.clone(),
            fields,
        }))
    }

    fn update(&self, collection: Collection, id: &DocumentId, fields: Fields) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(mut body) = self.load_body(collection, id)? else {
            return Err(StoreError::NotFound {
                collection,
                id: id.clone(),
            });
        };

        for (key, value) in fields {
            body.insert(key, value);
        }

        tx.execute(
            "UPDATE documents
             SET
                body = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?1 AND doc_id = ?2;",
            params![collection.as_str(), id.as_str(), encode_body(body)?],
        )?;
        tx.commit()?;
        debug!(
            "event=store_write module=store op=update collection={} doc_id={}",
            collection, id
        );
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &DocumentId) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![collection.as_str(), id.as_str()],
        )?;
        debug!(
            "event=store_write module=store op=delete collection={} doc_id={} changed={}",
            collection, id, changed
        );
        Ok(())
    }

    fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        if !is_valid_field_name(field) {
            return Err(StoreError::InvalidFieldPath(field.to_string()));
        }

        // Literal path keeps the expression identical to idx_documents_owner.
        let sql = format!(
            "SELECT doc_id, body
             FROM documents
             WHERE collection = ?1
               AND json_extract(body, '$.{field}') = ?2
             ORDER BY doc_id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![collection.as_str(), value])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let id = DocumentId::from_store(row.get("doc_id")?);
            let body: String = row.get("body")?;
            let fields = parse_body(collection, &id, &body)?;
            documents.push(Document { id, fields });
        }

        debug!(
            "event=store_query module=store collection={} field={} count={}",
            collection,
            field,
            documents.len()
        );
        Ok(documents)
    }
}

fn encode_body(fields: Fields) -> StoreResult<String> {
    serde_json::to_string(&Value::Object(fields))
        .map_err(|err| StoreError::InvalidDocument(format!("failed to encode body: {err}")))
}

fn parse_body(collection: Collection, id: &DocumentId, text: &str) -> StoreResult<Fields> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::InvalidDocument(format!(
            "{collection}/{id} body is not a JSON object"
        ))),
        Err(err) => Err(StoreError::InvalidDocument(format!(
            "{collection}/{id} body is not valid JSON: {err}"
        ))),
    }
}

fn is_valid_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixtures are objects"),
        }
    }

    #[test]
    fn add_assigns_unique_keys() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();

        let first = store
            .add(Collection::Tasks, fields(json!({ "title": "a" })))
            .unwrap();
        let second = store
            .add(Collection::Tasks, fields(json!({ "title": "a" })))
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn update_replaces_top_level_fields_only() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let id = store
            .add(
                Collection::Notes,
                fields(json!({ "title": "t", "content": "c", "photo": { "uri": "a.png" } })),
            )
            .unwrap();

        store
            .update(Collection::Notes, &id, fields(json!({ "photo": { "uri": "b.png" } })))
            .unwrap();

        let doc = store.get(Collection::Notes, &id).unwrap().unwrap();
        assert_eq!(doc.fields["title"], "t");
        assert_eq!(doc.fields["photo"], json!({ "uri": "b.png" }));
    }

    #[test]
    fn update_missing_document_is_not_found() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let id = DocumentId::parse("missing").unwrap();

        let err = store
            .update(Collection::Tasks, &id, Fields::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn collections_are_isolated() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let id = store
            .add(Collection::Tasks, fields(json!({ "userId": "u1" })))
            .unwrap();

        assert!(store.get(Collection::Notes, &id).unwrap().is_none());
        assert!(store
            .query_eq(Collection::Notes, "userId", "u1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn query_rejects_injection_in_field_names() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();

        let err = store
            .query_eq(Collection::Tasks, "userId') OR 1=1 --", "x")
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidFieldPath(_)));
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteDocumentStore::try_new(&conn);
        assert!(matches!(
            result,
            Err(StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }
}
