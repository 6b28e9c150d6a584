use notesapp_core::backend::memory::{BackendCall, InMemoryBackend};
use notesapp_core::{
    AuthError, AuthForm, AuthMode, NavigationGate, RemoteError, Route, Screen, SessionManager,
    SessionSnapshot,
};
use std::sync::{Arc, Mutex};

fn record_snapshots(session: &SessionManager<InMemoryBackend>) -> Arc<Mutex<Vec<SessionSnapshot>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.clone()));
    seen
}

#[tokio::test]
async fn startup_without_session_resolves_to_signed_out() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    let seen = record_snapshots(&session);
    assert!(session.is_loading());

    let snapshot = session.initialize().await.unwrap();
    assert!(!snapshot.loading);
    assert!(!snapshot.is_authenticated());
    assert_eq!(seen.lock().unwrap().as_slice(), &[snapshot]);
}

#[tokio::test]
async fn startup_restores_existing_session() {
    let backend = InMemoryBackend::new();
    let user = backend.with_signed_in_user("a@x.com", "pw123", "Ann");
    let session = SessionManager::new(backend.clone());

    let snapshot = session.initialize().await.unwrap();
    assert_eq!(snapshot.user, Some(user));
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn startup_failure_is_surfaced_but_still_ends_loading() {
    let backend = InMemoryBackend::new();
    backend.fail_next(BackendCall::GetAccount, RemoteError::transport("offline"));
    let session = SessionManager::new(backend.clone());

    let err = session.initialize().await.unwrap_err();
    assert!(matches!(err, AuthError::Unavailable(_)));
    assert!(!session.is_loading());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn startup_resolution_never_repeats() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    session.initialize().await.unwrap();
    backend.with_signed_in_user("a@x.com", "pw123", "Ann");

    let again = session.initialize().await.unwrap();
    assert!(!again.loading);
    assert!(!again.is_authenticated());
    assert_eq!(backend.calls(BackendCall::GetAccount), 1);
}

#[tokio::test]
async fn login_then_current_session_returns_same_identity() {
    let backend = InMemoryBackend::new();
    let seed = SessionManager::new(backend.clone());
    seed.register("a@x.com", "pw123", "Ann").await.unwrap();
    seed.logout().await.unwrap();

    let session = SessionManager::new(backend.clone());
    session.initialize().await.unwrap();
    let snapshot = session.login("a@x.com", "pw123").await.unwrap();
    let current = session.current_session().await.unwrap().unwrap();
    assert_eq!(snapshot.user, Some(current));
}

#[tokio::test]
async fn current_session_reports_none_when_not_logged_in() {
    let session = SessionManager::new(InMemoryBackend::new());
    assert_eq!(session.current_session().await.unwrap(), None);
}

#[tokio::test]
async fn wrong_password_is_rejected_and_state_stays_signed_out() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    session.register("a@x.com", "pw123", "Ann").await.unwrap();
    session.logout().await.unwrap();

    let err = session.login("a@x.com", "nope").await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
    assert_eq!(err.user_message(), "Invalid credentials.");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn blank_credentials_never_reach_the_collaborator() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());

    assert!(matches!(
        session.login("", "pw123").await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        session.register("a@x.com", "pw123", "  ").await,
        Err(AuthError::Validation(_))
    ));
    assert_eq!(backend.calls(BackendCall::CreateSession), 0);
    assert_eq!(backend.calls(BackendCall::CreateAccount), 0);
}

#[tokio::test]
async fn register_opens_a_session_for_the_new_account() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    session.initialize().await.unwrap();

    let snapshot = session.register("a@x.com", "pw123", "Ann").await.unwrap();
    let user = snapshot.user.unwrap();
    assert_eq!(user.name, "Ann");
    assert_eq!(user.email, "a@x.com");
    assert_eq!(backend.calls(BackendCall::CreateSession), 1);
    assert!(backend.has_session());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    session.register("a@x.com", "pw123", "Ann").await.unwrap();
    session.logout().await.unwrap();

    let err = session
        .register("a@x.com", "other", "Another Ann")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn logout_clears_local_state_even_when_remote_fails() {
    let backend = InMemoryBackend::new();
    backend.with_signed_in_user("a@x.com", "pw123", "Ann");
    let session = SessionManager::new(backend.clone());
    session.initialize().await.unwrap();
    backend.fail_next(BackendCall::DeleteSession, RemoteError::transport("timeout"));

    let err = session.logout().await.unwrap_err();
    assert!(matches!(err, AuthError::Unavailable(_)));
    assert!(!session.is_authenticated());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn observers_see_each_transition_until_unsubscribed() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = session.subscribe(move |snapshot| {
        sink.lock().unwrap().push(snapshot.is_authenticated());
    });

    session.initialize().await.unwrap();
    session.register("a@x.com", "pw123", "Ann").await.unwrap();
    session.logout().await.unwrap();
    assert_eq!(seen.lock().unwrap().as_slice(), &[false, true, false]);

    assert!(session.unsubscribe(id));
    assert!(!session.unsubscribe(id));
    session.login("a@x.com", "pw123").await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn navigation_gate_follows_session_state() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    let gate = NavigationGate::attach(&session);
    assert_eq!(gate.route(), Route::Splash);

    session.initialize().await.unwrap();
    assert_eq!(gate.route(), Route::SignedOut);
    assert!(gate.can_show(Screen::Auth));

    session.register("a@x.com", "pw123", "Ann").await.unwrap();
    assert_eq!(gate.route(), Route::SignedIn);
    assert!(gate.can_show(Screen::Notes));

    session.logout().await.unwrap();
    assert_eq!(gate.route(), Route::SignedOut);
    assert!(!gate.can_show(Screen::Notes));
    gate.detach(&session);
}

#[tokio::test]
async fn auth_form_validates_locally_and_shows_remote_messages() {
    let backend = InMemoryBackend::new();
    let session = SessionManager::new(backend.clone());
    session.initialize().await.unwrap();
    let mut form = AuthForm::new();

    assert!(form.submit(&session).await.is_none());
    assert_eq!(form.error_message(), Some("Email and password are required"));

    form.toggle_mode();
    assert_eq!(form.mode, AuthMode::Register);
    form.email = "a@x.com".to_string();
    form.password = "pw123".to_string();
    assert!(form.submit(&session).await.is_none());
    assert_eq!(form.error_message(), Some("Name is required for registration"));
    assert_eq!(backend.calls(BackendCall::CreateAccount), 0);

    form.name = "Ann".to_string();
    let snapshot = form.submit(&session).await.unwrap();
    assert_eq!(snapshot.user.unwrap().name, "Ann");
    assert_eq!(form.error_message(), None);

    session.logout().await.unwrap();
    form.toggle_mode();
    form.password = "wrong".to_string();
    assert!(form.submit(&session).await.is_none());
    assert_eq!(form.error_message(), Some("Invalid credentials."));
}
