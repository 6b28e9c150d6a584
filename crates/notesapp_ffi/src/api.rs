//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose session and note use-cases to Dart via FRB.
//! - Own the process-wide app instance and the runtime that drives it.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every response carries `ok` plus a human-readable `message`.
//! - Note responses always carry the full current list so the UI can
//!   re-render from one source of truth.
//!
//! # See also
//! - `notesapp_core::app::NotesApp`

use log::warn;
use notesapp_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AppwriteClient, BackendConfig, Note, NoteListError, NotePatch, NotesApp, Route,
    SessionSnapshot, ViewGuard,
};
use std::sync::{Mutex, OnceLock};
use tokio::runtime::Runtime;

const RUNTIME_WORKER_THREADS: usize = 2;

type App = NotesApp<AppwriteClient, AppwriteClient>;

struct FfiState {
    runtime: Runtime,
    app: App,
    /// Guard of the currently shown notes screen, reachable without the
    /// note-list lock so a closing screen can detach mid-request.
    view: Mutex<Option<ViewGuard>>,
}

static STATE: OnceLock<FfiState> = OnceLock::new();

fn state() -> Result<&'static FfiState, String> {
    if let Some(state) = STATE.get() {
        return Ok(state);
    }

    let config = BackendConfig::from_env().map_err(|err| format!("invalid config: {err}"))?;
    let client = AppwriteClient::new(&config)
        .map_err(|err| format!("failed to build backend client: {err}"))?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(RUNTIME_WORKER_THREADS)
        .enable_all()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let app = NotesApp::new(client.clone(), client, config.notes_collection());

    // Another thread may have won the race; its state is kept and ours dropped.
    let _ = STATE.set(FfiState {
        runtime,
        app,
        view: Mutex::new(None),
    });
    STATE
        .get()
        .ok_or_else(|| "app state unavailable after init".to_string())
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Session state envelope driving the navigation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub ok: bool,
    /// Inline error text for the auth form; empty on success.
    pub message: String,
    pub loading: bool,
    /// `splash|signed_out|signed_in`.
    pub route: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl SessionResponse {
    fn from_snapshot(snapshot: &SessionSnapshot, message: impl Into<String>) -> Self {
        let message = message.into();
        let user = snapshot.user.as_ref();
        Self {
            ok: message.is_empty(),
            message,
            loading: snapshot.loading,
            route: route_name(Route::for_session(snapshot)).to_string(),
            user_id: user.map(|u| u.id.clone()),
            email: user.map(|u| u.email.clone()),
            name: user.map(|u| u.display_name().to_string()),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            loading: false,
            route: route_name(Route::SignedOut).to_string(),
            user_id: None,
            email: None,
            name: None,
        }
    }
}

/// One note as rendered by the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&Note> for NoteItem {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            created_at: note.created_at.clone(),
            updated_at: note.updated_at.clone(),
        }
    }
}

/// Note list envelope returned by every note call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesResponse {
    pub ok: bool,
    pub message: String,
    /// Newest first.
    pub items: Vec<NoteItem>,
    pub loading: bool,
    /// Whether `notes_retry` may fix the last failure.
    pub retryable: bool,
}

impl NotesResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            items: Vec::new(),
            loading: false,
            retryable: false,
        }
    }
}

/// Resolves the startup session and fetches notes when signed in.
///
/// # FFI contract
/// - Async (worker thread); performs network I/O.
/// - Never panics.
pub fn app_start() -> SessionResponse {
    session_call(|app| async move { app.start().await.map(|_| ()) })
}

/// Current session without any network call.
#[flutter_rust_bridge::frb(sync)]
pub fn session_state() -> SessionResponse {
    match state() {
        Ok(state) => SessionResponse::from_snapshot(&state.app.session().snapshot(), ""),
        Err(err) => SessionResponse::failure(err),
    }
}

pub fn auth_login(email: String, password: String) -> SessionResponse {
    session_call(|app| async move { app.login(&email, &password).await.map(|_| ()) })
}

pub fn auth_register(email: String, password: String, name: String) -> SessionResponse {
    session_call(|app| async move {
        app.register(&email, &password, &name).await.map(|_| ())
    })
}

/// Logs out. The response is signed-out even when remote logout failed;
/// `message` then carries the remote error.
pub fn auth_logout() -> SessionResponse {
    session_call(|app| async move { app.logout().await })
}

/// Current local list; no network call.
pub fn notes_list() -> NotesResponse {
    notes_call(|_app| async move { Ok(()) })
}

pub fn notes_refresh() -> NotesResponse {
    notes_call(|app| async move { app.refresh_notes().await.map(|_| ()) })
}

pub fn note_create(content: String, title: Option<String>) -> NotesResponse {
    notes_call(|app| async move {
        app.create_note(&content, title.as_deref()).await.map(|_| ())
    })
}

pub fn note_update(id: String, title: Option<String>, content: Option<String>) -> NotesResponse {
    notes_call(|app| async move {
        app.update_note(&id, NotePatch { title, content })
            .await
            .map(|_| ())
    })
}

pub fn note_delete(id: String) -> NotesResponse {
    notes_call(|app| async move { app.delete_note(&id).await })
}

pub fn notes_retry() -> NotesResponse {
    notes_call(|app| async move { app.retry().await.map(|_| ()) })
}

/// Whether a note fetch is in flight. Safe to poll while another note call
/// is still running.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_loading_state() -> bool {
    match state() {
        Ok(state) => state.app.notes_loading(),
        Err(_) => false,
    }
}

/// Called when the notes screen appears: re-arms the list and re-fetches.
pub fn notes_screen_opened() -> NotesResponse {
    let state = match state() {
        Ok(state) => state,
        Err(err) => return NotesResponse::failure(err),
    };
    state.runtime.block_on(async {
        let guard = {
            let mut notes = state.app.notes().await;
            notes.remount();
            notes.view_guard()
        };
        set_view_guard(state, Some(guard));
        state.app.settle_notes().await;
        render_notes(&state.app, Ok(())).await
    })
}

/// Called when the notes screen goes away; late responses are then dropped.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_screen_closed() -> bool {
    match state() {
        Ok(state) => {
            if let Some(guard) = take_view_guard(state) {
                guard.detach();
            }
            true
        }
        Err(err) => {
            warn!("event=notes_screen_closed module=ffi status=error error={err}");
            false
        }
    }
}

fn session_call<F, Fut>(call: F) -> SessionResponse
where
    F: FnOnce(&'static App) -> Fut,
    Fut: std::future::Future<Output = Result<(), notesapp_core::AuthError>>,
{
    let state = match state() {
        Ok(state) => state,
        Err(err) => return SessionResponse::failure(err),
    };
    let result = state.runtime.block_on(call(&state.app));
    let message = match result {
        Ok(()) => String::new(),
        Err(err) => err.user_message(),
    };
    SessionResponse::from_snapshot(&state.app.session().snapshot(), message)
}

fn notes_call<F, Fut>(call: F) -> NotesResponse
where
    F: FnOnce(&'static App) -> Fut,
    Fut: std::future::Future<Output = Result<(), NoteListError>>,
{
    let state = match state() {
        Ok(state) => state,
        Err(err) => return NotesResponse::failure(err),
    };
    state.runtime.block_on(async {
        let result = call(&state.app).await;
        render_notes(&state.app, result).await
    })
}

async fn render_notes(app: &App, result: Result<(), NoteListError>) -> NotesResponse {
    let notes = app.notes().await;
    let failure = notes.last_failure();
    let message = match (&result, failure) {
        (Err(err), _) => err.to_string(),
        (Ok(()), Some(failed)) => failed.error.to_string(),
        (Ok(()), None) => String::new(),
    };
    NotesResponse {
        ok: result.is_ok(),
        message,
        items: notes.notes().iter().map(NoteItem::from).collect(),
        loading: app.notes_loading(),
        retryable: failure.map(|failed| failed.is_retryable()).unwrap_or(false),
    }
}

fn set_view_guard(state: &FfiState, guard: Option<ViewGuard>) {
    let mut slot = state
        .view
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = guard;
}

fn take_view_guard(state: &FfiState) -> Option<ViewGuard> {
    state
        .view
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

fn route_name(route: Route) -> &'static str {
    match route {
        Route::Splash => "splash",
        Route::SignedOut => "signed_out",
        Route::SignedIn => "signed_in",
    }
}

#[cfg(test)]
mod tests {
    use super::{core_version, init_logging, ping, route_name, SessionResponse};
    use notesapp_core::{Identity, Route, SessionSnapshot};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn core_version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_reports_invalid_level() {
        let error = init_logging("verbose".to_string(), "/tmp/notesapp-ffi-logs".to_string());
        assert!(error.contains("unsupported log level"));
    }

    #[test]
    fn session_response_mirrors_snapshot() {
        let snapshot = SessionSnapshot {
            user: Some(Identity::new("u1", "a@x.com", "")),
            loading: false,
        };
        let response = SessionResponse::from_snapshot(&snapshot, "");
        assert!(response.ok);
        assert_eq!(response.route, "signed_in");
        assert_eq!(response.user_id.as_deref(), Some("u1"));
        assert_eq!(response.name.as_deref(), Some("User"));

        let failed = SessionResponse::from_snapshot(
            &SessionSnapshot {
                user: None,
                loading: false,
            },
            "Invalid credentials.",
        );
        assert!(!failed.ok);
        assert_eq!(failed.route, route_name(Route::SignedOut));
    }
}
