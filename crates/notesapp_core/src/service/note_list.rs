//! Note list controller.
//!
//! # Responsibility
//! - Own the in-memory list of the signed-in user's notes.
//! - Fetch once per newly-available user and apply local changes only after
//!   the remote store confirms them.
//! - Keep the last remote failure so the UI can show it and retry.
//!
//! # Invariants
//! - Every listed note belongs to `owner`; foreign documents are dropped.
//! - The list is newest-first: creates prepend, updates keep position.
//! - A failed remote call leaves the list exactly as it was.
//! - Results arriving after the view detached are discarded unapplied.
//! - The loading flag is raised only while a list request is outstanding and
//!   drops back even when the request future is abandoned.
//!
//! # Concurrency
//! - Operations take `&mut self`; callers issue them one at a time.

use crate::backend::{unique_id, CollectionRef, DocumentStore, QueryFilter, RemoteError};
use crate::model::note::{NewNote, Note, NotePatch, RawDocument, CREATED_AT_FIELD, OWNER_FIELD};
use crate::model::validation::{require_non_blank, ValidationError};
use crate::service::session_manager::SessionSnapshot;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Note use-case failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteListError {
    /// Input rejected locally; the remote store was never called.
    Validation(ValidationError),
    /// No user is bound to the list yet.
    NotSignedIn,
    /// The request names a different user than the one the list belongs to.
    OwnerMismatch { owner: String, requested: String },
    /// Target id is not in the local list.
    UnknownNote(String),
    /// Remote store failure; recorded as the last failure.
    Remote(RemoteError),
    /// The view detached before the response arrived; nothing was applied.
    Detached,
    /// `retry` was called with no recorded failure.
    NothingToRetry,
    /// The store answered with a note owned by someone else; it was not listed.
    ForeignNote { id: String, owner: String },
}

impl Display for NoteListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotSignedIn => write!(f, "no signed-in user bound to the note list"),
            Self::OwnerMismatch { owner, requested } => write!(
                f,
                "note list belongs to `{owner}`, refusing request for `{requested}`"
            ),
            Self::UnknownNote(id) => write!(f, "note not found in list: {id}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Detached => write!(f, "view detached before the response arrived"),
            Self::NothingToRetry => write!(f, "no failed operation to retry"),
            Self::ForeignNote { id, owner } => {
                write!(f, "store returned note `{id}` owned by `{owner}`; not listed")
            }
        }
    }
}

impl Error for NoteListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for NoteListError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Replayable description of one list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteOperation {
    Load { user_id: String },
    Create(NewNote),
    Update { id: String, patch: NotePatch },
    Delete { id: String },
}

impl NoteOperation {
    fn label(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Create(_) => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Last remote failure, kept until a later operation succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOperation {
    pub operation: NoteOperation,
    pub error: RemoteError,
}

impl FailedOperation {
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

/// Result of a replayed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Loaded(Vec<Note>),
    Created(Note),
    Updated(Note),
    Deleted(String),
}

/// What the caller must do after a session change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSync {
    /// No user before or after.
    Idle,
    /// Same user as before; nothing to fetch.
    Unchanged,
    /// The user went away; the list was emptied.
    Cleared,
    /// A new user is available; call `load_notes` with this id.
    FetchRequired(String),
}

/// Liveness flag shared between the controller and the view that shows it.
#[derive(Debug, Clone)]
pub struct ViewGuard {
    mounted: Arc<AtomicBool>,
}

impl ViewGuard {
    fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Marks the view as gone. Late responses will be discarded.
    pub fn detach(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }
}

/// Shared "fetch in flight" flag, readable without access to the controller.
#[derive(Debug, Clone, Default)]
pub struct LoadIndicator {
    active: Arc<AtomicBool>,
}

impl LoadIndicator {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn begin(&self) -> LoadingScope {
        self.active.store(true, Ordering::Release);
        LoadingScope {
            active: Arc::clone(&self.active),
        }
    }
}

/// Lowers the flag on drop, so cancelled fetches cannot leave it raised.
struct LoadingScope {
    active: Arc<AtomicBool>,
}

impl Drop for LoadingScope {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// In-memory note list for the signed-in user.
pub struct NoteListController<D: DocumentStore> {
    store: D,
    collection: CollectionRef,
    owner: Option<String>,
    notes: Vec<Note>,
    loading: LoadIndicator,
    last_failure: Option<FailedOperation>,
    view: ViewGuard,
}

impl<D: DocumentStore> NoteListController<D> {
    /// Creates an idle, empty controller.
    pub fn new(store: D, collection: CollectionRef) -> Self {
        Self {
            store,
            collection,
            owner: None,
            notes: Vec::new(),
            loading: LoadIndicator::default(),
            last_failure: None,
            view: ViewGuard::new(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    /// Handle for showing a spinner while this controller is busy elsewhere.
    pub fn load_indicator(&self) -> LoadIndicator {
        self.loading.clone()
    }

    pub fn last_failure(&self) -> Option<&FailedOperation> {
        self.last_failure.as_ref()
    }

    pub fn dismiss_failure(&mut self) {
        self.last_failure = None;
    }

    /// Handle for the view to signal it went away.
    pub fn view_guard(&self) -> ViewGuard {
        self.view.clone()
    }

    /// Re-arms for a newly mounted view and forgets the owner, so the next
    /// session sync fetches again. Old guards stay detached.
    pub fn remount(&mut self) {
        self.view = ViewGuard::new();
        self.owner = None;
        self.notes.clear();
        self.last_failure = None;
    }

    /// Aligns the list with the session's user.
    pub fn sync_with_session(&mut self, session: &SessionSnapshot) -> SessionSync {
        match session.user_id() {
            None => {
                if self.owner.take().is_none() && self.notes.is_empty() {
                    return SessionSync::Idle;
                }
                self.notes.clear();
                self.last_failure = None;
                debug!("event=notes_sync module=notes status=cleared");
                SessionSync::Cleared
            }
            Some(user_id) if self.owner.as_deref() == Some(user_id) => SessionSync::Unchanged,
            Some(user_id) => {
                self.notes.clear();
                self.last_failure = None;
                self.owner = Some(user_id.to_string());
                debug!("event=notes_sync module=notes status=fetch_required");
                SessionSync::FetchRequired(user_id.to_string())
            }
        }
    }

    /// Fetches the user's notes, newest first, replacing the local list.
    pub async fn load_notes(&mut self, user_id: &str) -> Result<Vec<Note>, NoteListError> {
        require_non_blank("user_id", user_id)?;
        let operation = NoteOperation::Load {
            user_id: user_id.to_string(),
        };
        let filters = [
            QueryFilter::equal(OWNER_FIELD, user_id),
            QueryFilter::order_desc(CREATED_AT_FIELD),
        ];

        let listed = {
            let _scope = self.loading.begin();
            self.store.list(&self.collection, &filters).await
        };

        let docs = match listed {
            Ok(docs) => docs,
            Err(err) => return Err(self.fail(operation, err)),
        };
        self.ensure_mounted(&operation)?;

        let total = docs.len();
        let notes: Vec<Note> = docs
            .iter()
            .filter_map(Note::from_document)
            .filter(|note| note.is_owned_by(user_id))
            .collect();
        let dropped = total - notes.len();
        if dropped > 0 {
            warn!("event=notes_load module=notes status=filtered dropped={dropped}");
        }

        self.owner = Some(user_id.to_string());
        self.notes = notes.clone();
        self.last_failure = None;
        info!("event=notes_load module=notes status=ok count={}", notes.len());
        Ok(notes)
    }

    /// Creates a note remotely, then prepends the server's version.
    pub async fn create_note(
        &mut self,
        content: &str,
        title: Option<&str>,
        user_id: &str,
    ) -> Result<Note, NoteListError> {
        let input = NewNote {
            content: content.to_string(),
            title: title.map(str::to_string),
            user_id: user_id.to_string(),
        };
        self.run_create(input).await
    }

    /// Patches a listed note remotely, then replaces it in place.
    pub async fn update_note(&mut self, id: &str, patch: NotePatch) -> Result<Note, NoteListError> {
        self.run_update(id.to_string(), patch).await
    }

    /// Deletes a note remotely, then removes it locally.
    pub async fn delete_note(&mut self, id: &str) -> Result<(), NoteListError> {
        self.run_delete(id.to_string()).await
    }

    /// Re-issues the last failed operation.
    pub async fn retry(&mut self) -> Result<OperationOutcome, NoteListError> {
        let failed = self
            .last_failure
            .clone()
            .ok_or(NoteListError::NothingToRetry)?;
        info!(
            "event=notes_retry module=notes status=started op={}",
            failed.operation.label()
        );
        match failed.operation {
            NoteOperation::Load { user_id } => {
                self.load_notes(&user_id).await.map(OperationOutcome::Loaded)
            }
            NoteOperation::Create(input) => {
                self.run_create(input).await.map(OperationOutcome::Created)
            }
            NoteOperation::Update { id, patch } => {
                self.run_update(id, patch).await.map(OperationOutcome::Updated)
            }
            NoteOperation::Delete { id } => self
                .run_delete(id.clone())
                .await
                .map(|()| OperationOutcome::Deleted(id)),
        }
    }

    async fn run_create(&mut self, input: NewNote) -> Result<Note, NoteListError> {
        input.validate()?;
        match self.owner.as_deref() {
            None => return Err(NoteListError::NotSignedIn),
            Some(owner) if owner != input.user_id => {
                return Err(NoteListError::OwnerMismatch {
                    owner: owner.to_string(),
                    requested: input.user_id.clone(),
                });
            }
            Some(_) => {}
        }

        let owner = input.user_id.clone();
        let document_id = unique_id();
        let created = self
            .store
            .create(&self.collection, &document_id, &input.to_fields())
            .await;
        let operation = NoteOperation::Create(input);
        let note = self.accept_document(operation, created)?;
        if !note.is_owned_by(&owner) {
            // The note exists remotely, so replaying the create would duplicate it.
            warn!(
                "event=note_create module=notes status=filtered note_id={} reason=owner_mismatch",
                note.id
            );
            return Err(NoteListError::ForeignNote {
                id: note.id,
                owner: note.user_id,
            });
        }

        self.notes.insert(0, note.clone());
        info!("event=note_create module=notes status=ok note_id={}", note.id);
        Ok(note)
    }

    async fn run_update(&mut self, id: String, patch: NotePatch) -> Result<Note, NoteListError> {
        require_non_blank("id", &id)?;
        patch.validate()?;
        if self.position(&id).is_none() {
            return Err(NoteListError::UnknownNote(id));
        }

        let updated = self
            .store
            .update(&self.collection, &id, &patch.to_fields())
            .await;
        let operation = NoteOperation::Update {
            id: id.clone(),
            patch,
        };
        let note = self.accept_document(operation, updated)?;

        match self.position(&id) {
            Some(index) => self.notes[index] = note.clone(),
            None => return Err(NoteListError::UnknownNote(id)),
        }
        info!("event=note_update module=notes status=ok note_id={id}");
        Ok(note)
    }

    async fn run_delete(&mut self, id: String) -> Result<(), NoteListError> {
        require_non_blank("id", &id)?;

        let deleted = self.store.delete(&self.collection, &id).await;
        let operation = NoteOperation::Delete { id: id.clone() };
        if let Err(err) = deleted {
            return Err(self.fail(operation, err));
        }
        self.ensure_mounted(&operation)?;

        self.notes.retain(|note| note.id != id);
        self.last_failure = None;
        info!("event=note_delete module=notes status=ok note_id={id}");
        Ok(())
    }

    /// Turns a create/update response into a `Note`, recording failures.
    fn accept_document(
        &mut self,
        operation: NoteOperation,
        response: Result<RawDocument, RemoteError>,
    ) -> Result<Note, NoteListError> {
        let doc = match response {
            Ok(doc) => doc,
            Err(err) => return Err(self.fail(operation, err)),
        };
        self.ensure_mounted(&operation)?;
        let note = match Note::from_document(&doc) {
            Some(note) => note,
            None => {
                let err = RemoteError::decode("document response carried no id");
                return Err(self.fail(operation, err));
            }
        };
        self.last_failure = None;
        Ok(note)
    }

    fn ensure_mounted(&self, operation: &NoteOperation) -> Result<(), NoteListError> {
        if self.view.is_mounted() {
            return Ok(());
        }
        debug!(
            "event=notes_response module=notes status=discarded op={} reason=view_detached",
            operation.label()
        );
        Err(NoteListError::Detached)
    }

    fn fail(&mut self, operation: NoteOperation, error: RemoteError) -> NoteListError {
        if !self.view.is_mounted() {
            return NoteListError::Detached;
        }
        warn!(
            "event=note_{} module=notes status=error kind={} retryable={}",
            operation.label(),
            error.kind.as_str(),
            error.is_retryable()
        );
        self.last_failure = Some(FailedOperation {
            operation,
            error: error.clone(),
        });
        NoteListError::Remote(error)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }
}
