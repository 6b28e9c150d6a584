//! Core logic for the notes app.
//! Session state, the note list, and the collaborator ports they sit on.

pub mod app;
pub mod backend;
pub mod config;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod service;

pub use app::NotesApp;
pub use backend::appwrite::AppwriteClient;
pub use backend::{
    AuthGateway, CollectionRef, DocumentStore, QueryFilter, RemoteError, RemoteErrorKind,
    RemoteResult, SessionTicket,
};
pub use config::{BackendConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::identity::Identity;
pub use model::note::{NewNote, Note, NotePatch, RawDocument};
pub use model::validation::ValidationError;
pub use navigation::{NavigationGate, Route, Screen};
pub use service::auth_form::{AuthForm, AuthMode};
pub use service::note_editor::{NoteEditor, SaveOutcome};
pub use service::note_list::{
    FailedOperation, LoadIndicator, NoteListController, NoteListError, NoteOperation,
    OperationOutcome, SessionSync, ViewGuard,
};
pub use service::session_manager::{
    AuthError, SessionManager, SessionObserver, SessionSnapshot, SubscriptionId,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
