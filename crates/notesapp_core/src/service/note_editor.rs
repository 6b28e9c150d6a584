//! Create/edit dialog state for the notes screen.

use crate::backend::DocumentStore;
use crate::model::note::{Note, NotePatch};
use crate::service::note_list::{NoteListController, NoteListError};

/// What `save` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Text was blank; nothing was sent and the editor stays open.
    Skipped,
    Created(Note),
    Updated(Note),
}

/// Editor dialog state. One editor serves both "new note" and "edit note".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEditor {
    visible: bool,
    text: String,
    editing_id: Option<String>,
}

impl NoteEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn open_new(&mut self) {
        self.editing_id = None;
        self.text.clear();
        self.visible = true;
    }

    /// Opens the editor prefilled with an existing note's content.
    pub fn edit(&mut self, note: &Note) {
        self.editing_id = Some(note.id.clone());
        self.text = note.content.clone();
        self.visible = true;
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    /// Creates or updates depending on mode. The editor closes only on success.
    pub async fn save<D: DocumentStore>(
        &mut self,
        notes: &mut NoteListController<D>,
        user_id: &str,
    ) -> Result<SaveOutcome, NoteListError> {
        if self.text.trim().is_empty() {
            return Ok(SaveOutcome::Skipped);
        }

        let outcome = match self.editing_id.as_deref() {
            Some(id) => {
                let patch = NotePatch::content(self.text.clone());
                SaveOutcome::Updated(notes.update_note(id, patch).await?)
            }
            None => SaveOutcome::Created(notes.create_note(&self.text, None, user_id).await?),
        };
        self.close();
        Ok(outcome)
    }
}
