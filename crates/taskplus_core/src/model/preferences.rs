//! Per-user preferences stored under the owner's identifier.

use super::fields;
use crate::store::Document;
use crate::timestamp::instant_from_field;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub(crate) const DARK_MODE: &str = "darkMode";

/// Preferences as read from the `userPreferences` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    owner_id: String,
    pub dark_mode: bool,
    /// Set on the first write only.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesDocument {
    #[serde(default)]
    dark_mode: bool,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

impl UserPreferences {
    /// Owner identifier; doubles as the document key.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub(crate) fn from_document(document: &Document) -> Result<Self, String> {
        let decoded: PreferencesDocument =
            serde_json::from_value(Value::Object(document.fields.clone()))
                .map_err(|err| format!("userPreferences/{}: {err}", document.id))?;

        Ok(Self {
            owner_id: document.id.as_str().to_string(),
            dark_mode: decoded.dark_mode,
            created_at: decoded
                .created_at
                .and_then(|value| instant_from_field(fields::CREATED_AT, &value)),
            updated_at: decoded
                .updated_at
                .and_then(|value| instant_from_field(fields::UPDATED_AT, &value)),
        })
    }
}

/// Partial preferences update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default)]
    pub dark_mode: Option<bool>,
}

impl PreferencesPatch {
    pub fn dark_mode(enabled: bool) -> Self {
        Self {
            dark_mode: Some(enabled),
        }
    }
}
