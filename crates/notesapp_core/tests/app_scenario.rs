use notesapp_core::backend::memory::{BackendCall, InMemoryBackend};
use notesapp_core::{
    CollectionRef, NoteListError, NotePatch, NotesApp, OperationOutcome, RawDocument, RemoteError,
    SessionSync,
};
use serde_json::json;

fn collection() -> CollectionRef {
    CollectionRef::new("db", "notes")
}

fn build_app(backend: &InMemoryBackend) -> NotesApp<InMemoryBackend, InMemoryBackend> {
    NotesApp::new(backend.clone(), backend.clone(), collection())
}

fn fields(user_id: &str, content: &str) -> RawDocument {
    json!({ "content": content, "userId": user_id })
        .as_object()
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn register_create_update_delete_scenario() {
    let backend = InMemoryBackend::new();
    let app = build_app(&backend);
    app.start().await.unwrap();

    let snapshot = app.register("a@x.com", "pw123", "Ann").await.unwrap();
    let ann = snapshot.user.unwrap();
    assert_eq!(ann.name, "Ann");

    let created = app.create_note("Buy milk", None).await.unwrap();
    {
        let notes = app.notes().await;
        assert_eq!(notes.notes().len(), 1);
        assert_eq!(notes.notes()[0].content, "Buy milk");
        assert_eq!(notes.notes()[0].user_id, ann.id);
    }

    app.update_note(&created.id, NotePatch::content("Buy oat milk"))
        .await
        .unwrap();
    assert_eq!(app.notes().await.notes()[0].content, "Buy oat milk");

    app.delete_note(&created.id).await.unwrap();
    assert!(app.notes().await.notes().is_empty());
}

#[tokio::test]
async fn startup_with_session_fetches_notes_exactly_once() {
    let backend = InMemoryBackend::new();
    let user = backend.with_signed_in_user("a@x.com", "pw123", "Ann");
    backend.insert_document(&collection(), fields(&user.id, "existing"));
    let app = build_app(&backend);

    app.start().await.unwrap();
    assert!(!app.notes_loading());
    assert_eq!(app.notes().await.notes().len(), 1);
    assert_eq!(app.settle_notes().await, SessionSync::Unchanged);
    assert_eq!(backend.calls(BackendCall::List), 1);
}

#[tokio::test]
async fn signed_out_app_refuses_note_operations() {
    let backend = InMemoryBackend::new();
    let app = build_app(&backend);
    app.start().await.unwrap();

    let err = app.create_note("X", None).await.unwrap_err();
    assert_eq!(err, NoteListError::NotSignedIn);
    assert_eq!(app.refresh_notes().await.unwrap_err(), NoteListError::NotSignedIn);
    assert_eq!(backend.calls(BackendCall::List), 0);
}

#[tokio::test]
async fn logout_clears_notes_even_when_remote_logout_fails() {
    let backend = InMemoryBackend::new();
    let app = build_app(&backend);
    app.start().await.unwrap();
    app.register("a@x.com", "pw123", "Ann").await.unwrap();
    app.create_note("X", None).await.unwrap();
    backend.fail_next(BackendCall::DeleteSession, RemoteError::transport("offline"));

    assert!(app.logout().await.is_err());
    assert!(!app.session().is_authenticated());
    assert!(app.notes().await.notes().is_empty());
    assert_eq!(app.notes().await.owner(), None);
}

#[tokio::test]
async fn fetch_failure_after_login_is_kept_for_retry() {
    let backend = InMemoryBackend::new();
    let user = backend.with_signed_in_user("a@x.com", "pw123", "Ann");
    backend.insert_document(&collection(), fields(&user.id, "existing"));
    let app = build_app(&backend);
    app.start().await.unwrap();
    app.logout().await.unwrap();
    backend.fail_next(BackendCall::List, RemoteError::transport("offline"));

    let snapshot = app.login("a@x.com", "pw123").await.unwrap();
    assert!(snapshot.is_authenticated());
    {
        let notes = app.notes().await;
        assert!(notes.notes().is_empty());
        assert!(notes.last_failure().unwrap().is_retryable());
    }

    match app.retry().await.unwrap() {
        OperationOutcome::Loaded(notes) => assert_eq!(notes.len(), 1),
        other => panic!("expected reload, got {other:?}"),
    }
}

#[tokio::test]
async fn switching_users_never_mixes_note_lists() {
    let backend = InMemoryBackend::new();
    let app = build_app(&backend);
    app.start().await.unwrap();

    app.register("ann@x.com", "pw123", "Ann").await.unwrap();
    app.create_note("ann's note", None).await.unwrap();
    app.logout().await.unwrap();

    let bob = app
        .register("bob@x.com", "pw456", "Bob")
        .await
        .unwrap()
        .user
        .unwrap();
    let notes = app.notes().await;
    assert_eq!(notes.owner(), Some(bob.id.as_str()));
    assert!(notes.notes().is_empty());
}
