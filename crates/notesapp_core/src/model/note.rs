//! Note domain model and remote document normalization.
//!
//! # Responsibility
//! - Define the canonical `Note` shape used by the list controller.
//! - Translate raw remote documents into `Note` with defined defaults.
//! - Build the field maps sent to the remote store on create/update.
//!
//! # Invariants
//! - `id`, `created_at`, `updated_at` are server-assigned and read-only here.
//! - Missing `title`/`content` normalize to `""`, missing timestamps to `None`.
//! - A document without any id key cannot be normalized.

use crate::model::validation::{require_non_blank, ValidationError};
use serde_json::{Map, Value};

/// Raw document as returned by the remote store.
pub type RawDocument = Map<String, Value>;

/// Field carrying the owner identity on stored notes.
pub const OWNER_FIELD: &str = "userId";
/// Server-assigned creation timestamp used for newest-first ordering.
pub const CREATED_AT_FIELD: &str = "$createdAt";

/// A user-owned text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Owner identity; empty when the document carried none.
    pub user_id: String,
}

impl Note {
    /// Normalizes one raw document.
    ///
    /// Returns `None` when neither `$id` nor `id` is present.
    pub fn from_document(doc: &RawDocument) -> Option<Self> {
        let id = first_text(doc, &["$id", "id"])?;
        Some(Self {
            id,
            title: first_text(doc, &["title"]).unwrap_or_default(),
            content: first_text(doc, &["content"]).unwrap_or_default(),
            created_at: first_text(doc, &["createdAt", CREATED_AT_FIELD]),
            updated_at: first_text(doc, &["updatedAt", "$updatedAt"]),
            user_id: first_text(doc, &[OWNER_FIELD]).unwrap_or_default(),
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Input for creating one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub content: String,
    pub title: Option<String>,
    pub user_id: String,
}

impl NewNote {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("content", &self.content)?;
        require_non_blank("user_id", &self.user_id)
    }

    /// Fields sent to the remote store. Timestamps are left to the server.
    pub fn to_fields(&self) -> RawDocument {
        let mut fields = Map::new();
        fields.insert(
            "title".to_string(),
            Value::String(self.title.clone().unwrap_or_default()),
        );
        fields.insert("content".to_string(), Value::String(self.content.clone()));
        fields.insert(OWNER_FIELD.to_string(), Value::String(self.user_id.clone()));
        fields
    }
}

/// Partial update for one note. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("patch", "must change title or content"));
        }
        if let Some(content) = self.content.as_deref() {
            require_non_blank("content", content)?;
        }
        Ok(())
    }

    pub fn to_fields(&self) -> RawDocument {
        let mut fields = Map::new();
        if let Some(title) = self.title.as_ref() {
            fields.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(content) = self.content.as_ref() {
            fields.insert("content".to_string(), Value::String(content.clone()));
        }
        fields
    }
}

fn first_text(doc: &RawDocument, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| doc.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{NewNote, Note, NotePatch, RawDocument};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> RawDocument {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn normalizes_provider_document_with_system_fields() {
        let note = Note::from_document(&doc(json!({
            "$id": "n1",
            "title": "Groceries",
            "content": "Buy milk",
            "userId": "u1",
            "$createdAt": "2025-01-01T10:00:00.000+00:00",
            "$updatedAt": "2025-01-02T10:00:00.000+00:00",
            "$permissions": []
        })))
        .unwrap();

        assert_eq!(note.id, "n1");
        assert_eq!(note.title, "Groceries");
        assert_eq!(
            note.created_at.as_deref(),
            Some("2025-01-01T10:00:00.000+00:00")
        );
        assert_eq!(
            note.updated_at.as_deref(),
            Some("2025-01-02T10:00:00.000+00:00")
        );
        assert!(note.is_owned_by("u1"));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let note = Note::from_document(&doc(json!({ "id": "n2", "title": null }))).unwrap();
        assert_eq!(note.title, "");
        assert_eq!(note.content, "");
        assert_eq!(note.created_at, None);
        assert_eq!(note.updated_at, None);
        assert_eq!(note.user_id, "");
    }

    #[test]
    fn explicit_timestamps_win_over_system_fields() {
        let note = Note::from_document(&doc(json!({
            "$id": "n3",
            "createdAt": "custom",
            "$createdAt": "system"
        })))
        .unwrap();
        assert_eq!(note.created_at.as_deref(), Some("custom"));
    }

    #[test]
    fn document_without_id_is_rejected() {
        assert!(Note::from_document(&doc(json!({ "content": "orphan" }))).is_none());
    }

    #[test]
    fn new_note_requires_non_blank_content() {
        let input = NewNote {
            content: "   ".to_string(),
            title: None,
            user_id: "u1".to_string(),
        };
        assert_eq!(input.validate().unwrap_err().field, "content");
    }

    #[test]
    fn new_note_fields_default_title_to_empty() {
        let input = NewNote {
            content: "Buy milk".to_string(),
            title: None,
            user_id: "u1".to_string(),
        };
        let fields = input.to_fields();
        assert_eq!(fields["title"], json!(""));
        assert_eq!(fields["userId"], json!("u1"));
    }

    #[test]
    fn patch_only_carries_given_fields() {
        let fields = NotePatch::content("Y").to_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["content"], json!("Y"));
    }

    #[test]
    fn empty_or_blank_patch_is_invalid() {
        assert_eq!(NotePatch::default().validate().unwrap_err().field, "patch");
        assert_eq!(
            NotePatch::content(" ").validate().unwrap_err().field,
            "content"
        );
        let title_only = NotePatch {
            title: Some(String::new()),
            content: None,
        };
        assert!(title_only.validate().is_ok());
    }
}
