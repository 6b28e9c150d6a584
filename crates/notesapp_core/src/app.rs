//! Composition root wiring session state to the note list.
//!
//! # Responsibility
//! - Construct both components from injected collaborators.
//! - Trigger the note fetch exactly once per newly-available user.
//! - Serialize note operations the way a single UI would issue them.
//!
//! # Invariants
//! - A failed note fetch never turns a successful login into a failure; it
//!   is kept as the controller's retryable failure instead.

use crate::backend::{AuthGateway, CollectionRef, DocumentStore};
use crate::model::note::{Note, NotePatch};
use crate::service::note_list::{
    LoadIndicator, NoteListController, NoteListError, OperationOutcome, SessionSync,
};
use crate::service::session_manager::{AuthError, SessionManager, SessionSnapshot};
use log::warn;
use tokio::sync::{Mutex, MutexGuard};

/// Session manager plus note list for one running app instance.
pub struct NotesApp<A: AuthGateway, D: DocumentStore> {
    session: SessionManager<A>,
    notes: Mutex<NoteListController<D>>,
    loading: LoadIndicator,
}

impl<A: AuthGateway, D: DocumentStore> NotesApp<A, D> {
    pub fn new(auth: A, store: D, collection: CollectionRef) -> Self {
        let notes = NoteListController::new(store, collection);
        Self {
            session: SessionManager::new(auth),
            loading: notes.load_indicator(),
            notes: Mutex::new(notes),
        }
    }

    pub fn session(&self) -> &SessionManager<A> {
        &self.session
    }

    /// True while a note fetch is in flight; never waits on the note list.
    pub fn notes_loading(&self) -> bool {
        self.loading.is_active()
    }

    /// Exclusive access to the note list. Hold it for one UI action only.
    pub async fn notes(&self) -> MutexGuard<'_, NoteListController<D>> {
        self.notes.lock().await
    }

    /// Resolves the startup session, then fetches notes if signed in.
    pub async fn start(&self) -> Result<SessionSnapshot, AuthError> {
        let resolved = self.session.initialize().await;
        self.settle_notes().await;
        resolved
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        let snapshot = self.session.login(email, password).await?;
        self.settle_notes().await;
        Ok(snapshot)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SessionSnapshot, AuthError> {
        let snapshot = self.session.register(email, password, name).await?;
        self.settle_notes().await;
        Ok(snapshot)
    }

    /// Logs out; the note list is cleared even when remote logout fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.session.logout().await;
        self.settle_notes().await;
        result
    }

    /// Aligns the note list with the current session, fetching when needed.
    pub async fn settle_notes(&self) -> SessionSync {
        let snapshot = self.session.snapshot();
        let mut notes = self.notes.lock().await;
        let sync = notes.sync_with_session(&snapshot);
        if let SessionSync::FetchRequired(user_id) = &sync {
            if let Err(err) = notes.load_notes(user_id).await {
                warn!("event=notes_autoload module=app status=error error={err}");
            }
        }
        sync
    }

    /// Explicit re-fetch for the signed-in user.
    pub async fn refresh_notes(&self) -> Result<Vec<Note>, NoteListError> {
        let user_id = self.signed_in_user_id()?;
        self.notes.lock().await.load_notes(&user_id).await
    }

    pub async fn create_note(&self, content: &str, title: Option<&str>) -> Result<Note, NoteListError> {
        let user_id = self.signed_in_user_id()?;
        self.notes
            .lock()
            .await
            .create_note(content, title, &user_id)
            .await
    }

    pub async fn update_note(&self, id: &str, patch: NotePatch) -> Result<Note, NoteListError> {
        self.notes.lock().await.update_note(id, patch).await
    }

    pub async fn delete_note(&self, id: &str) -> Result<(), NoteListError> {
        self.notes.lock().await.delete_note(id).await
    }

    pub async fn retry(&self) -> Result<OperationOutcome, NoteListError> {
        self.notes.lock().await.retry().await
    }

    fn signed_in_user_id(&self) -> Result<String, NoteListError> {
        self.session
            .snapshot()
            .user
            .map(|user| user.id)
            .ok_or(NoteListError::NotSignedIn)
    }
}
