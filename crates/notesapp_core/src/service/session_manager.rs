//! Session state owner and auth use-cases.
//!
//! # Responsibility
//! - Resolve the session once at startup and expose `{user, loading}`.
//! - Run register/login/logout against the auth collaborator.
//! - Notify subscribers synchronously on every state transition.
//!
//! # Invariants
//! - `loading` is true only before the first resolution; nothing re-enters it.
//! - `user` is present iff the session is authenticated.
//! - Logout always ends unauthenticated, even when remote termination fails.
//! - Observers run after the state lock is released and before the call returns.

use crate::backend::{AuthGateway, RemoteError, RemoteErrorKind, CURRENT_SESSION};
use crate::model::identity::Identity;
use crate::model::validation::{require_non_blank, require_present, ValidationError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};

const AUTH_FAILED_MESSAGE: &str = "Authentication failed";

/// Auth use-case failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Input rejected locally; the collaborator was never called.
    Validation(ValidationError),
    /// The collaborator refused the credentials or registration.
    Rejected(RemoteError),
    /// The collaborator could not be reached or failed internally.
    Unavailable(RemoteError),
}

impl AuthError {
    /// Message suitable for inline display on the auth form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Rejected(err) | Self::Unavailable(err) => {
                if err.message.trim().is_empty() {
                    AUTH_FAILED_MESSAGE.to_string()
                } else {
                    err.message.clone()
                }
            }
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Rejected(err) | Self::Unavailable(err) => err.kind.as_str(),
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Rejected(err) => write!(f, "authentication rejected: {err}"),
            Self::Unavailable(err) => write!(f, "authentication unavailable: {err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Rejected(err) | Self::Unavailable(err) => Some(err),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RemoteError> for AuthError {
    fn from(value: RemoteError) -> Self {
        match value.kind {
            RemoteErrorKind::Unauthorized
            | RemoteErrorKind::Conflict
            | RemoteErrorKind::InvalidRequest
            | RemoteErrorKind::NotFound => Self::Rejected(value),
            _ => Self::Unavailable(value),
        }
    }
}

/// Internal session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionPhase {
    Initializing,
    Authenticated(Identity),
    Unauthenticated,
}

/// Observable session state handed to subscribers and callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<Identity>,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }
}

impl From<&SessionPhase> for SessionSnapshot {
    fn from(phase: &SessionPhase) -> Self {
        match phase {
            SessionPhase::Initializing => Self {
                user: None,
                loading: true,
            },
            SessionPhase::Authenticated(identity) => Self {
                user: Some(identity.clone()),
                loading: false,
            },
            SessionPhase::Unauthenticated => Self {
                user: None,
                loading: false,
            },
        }
    }
}

/// Callback invoked with the new snapshot after each transition.
pub type SessionObserver = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

/// Handle returned by [`SessionManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    entries: Vec<(SubscriptionId, SessionObserver)>,
}

/// Owns authentication state for the lifetime of the process.
pub struct SessionManager<A: AuthGateway> {
    gateway: A,
    phase: Mutex<SessionPhase>,
    observers: Mutex<ObserverList>,
}

impl<A: AuthGateway> SessionManager<A> {
    /// Creates a manager in the `loading` state.
    pub fn new(gateway: A) -> Self {
        Self {
            gateway,
            phase: Mutex::new(SessionPhase::Initializing),
            observers: Mutex::new(ObserverList::default()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.lock_phase())
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.snapshot().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot().loading
    }

    /// Registers an observer called on every subsequent state transition.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        let mut observers = self.lock_observers();
        observers.next_id += 1;
        let id = SubscriptionId(observers.next_id);
        observers.entries.push((id, Arc::new(observer)));
        id
    }

    /// Removes one observer. Returns `false` when the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.lock_observers();
        let before = observers.entries.len();
        observers.entries.retain(|(entry_id, _)| *entry_id != id);
        observers.entries.len() != before
    }

    /// Queries the collaborator for the active session without changing state.
    ///
    /// "Not logged in" is an expected answer and maps to `Ok(None)`.
    ///
    /// # Errors
    /// - Returns `AuthError::Unavailable` for transport/server failures.
    pub async fn current_session(&self) -> Result<Option<Identity>, AuthError> {
        match self.gateway.get_account().await {
            Ok(identity) => Ok(Some(identity)),
            Err(err) if err.kind == RemoteErrorKind::Unauthorized => {
                debug!("event=session_query module=session status=ok authenticated=false");
                Ok(None)
            }
            Err(err) => {
                warn!(
                    "event=session_query module=session status=error kind={}",
                    err.kind.as_str()
                );
                Err(AuthError::Unavailable(err))
            }
        }
    }

    /// Resolves the startup session exactly once.
    ///
    /// Always leaves the loading state, even on failure, so the UI never
    /// hangs on a spinner. Later calls return the current snapshot untouched.
    pub async fn initialize(&self) -> Result<SessionSnapshot, AuthError> {
        if !self.is_loading() {
            debug!("event=session_init module=session status=skipped reason=already_resolved");
            return Ok(self.snapshot());
        }

        let resolved = self.current_session().await;
        let next = match &resolved {
            Ok(Some(identity)) => SessionPhase::Authenticated(identity.clone()),
            Ok(None) | Err(_) => SessionPhase::Unauthenticated,
        };
        // A login may have completed while the query was in flight.
        let snapshot = self.transition_if(next, |phase| *phase == SessionPhase::Initializing);
        info!(
            "event=session_init module=session status={} authenticated={}",
            if resolved.is_ok() { "ok" } else { "error" },
            snapshot.is_authenticated()
        );
        resolved.map(|_| snapshot)
    }

    /// Creates an account, then logs in with the same credentials.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SessionSnapshot, AuthError> {
        validate_credentials(email, password)?;
        require_non_blank("name", name)?;

        if let Err(err) = self.gateway.create_account(email, password, name).await {
            let err = AuthError::from(err);
            warn!(
                "event=auth_register module=session status=error kind={}",
                err.kind_label()
            );
            return Err(err);
        }
        info!("event=auth_register module=session status=ok");
        self.login(email, password).await
    }

    /// Opens a session and loads the account behind it.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        validate_credentials(email, password)?;

        let identity = match self.open_session(email, password).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(
                    "event=auth_login module=session status=error kind={}",
                    err.kind_label()
                );
                return Err(err);
            }
        };
        info!("event=auth_login module=session status=ok");
        Ok(self.transition_if(SessionPhase::Authenticated(identity), |_| true))
    }

    /// Terminates the active session.
    ///
    /// Local state is cleared whether or not the remote call succeeds; the
    /// remote error, if any, is still returned.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let remote = self.gateway.delete_session(CURRENT_SESSION).await;
        self.transition_if(SessionPhase::Unauthenticated, |_| true);
        match remote {
            Ok(()) => {
                info!("event=auth_logout module=session status=ok");
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=auth_logout module=session status=error kind={} local_state=cleared",
                    err.kind.as_str()
                );
                Err(AuthError::from(err))
            }
        }
    }

    async fn open_session(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.gateway.create_session(email, password).await?;
        Ok(self.gateway.get_account().await?)
    }

    /// Applies `next` when `guard` accepts the current phase, then notifies.
    fn transition_if<G>(&self, next: SessionPhase, guard: G) -> SessionSnapshot
    where
        G: FnOnce(&SessionPhase) -> bool,
    {
        let (before, after) = {
            let mut phase = self.lock_phase();
            let before = SessionSnapshot::from(&*phase);
            if guard(&*phase) {
                *phase = next;
            }
            (before, SessionSnapshot::from(&*phase))
        };

        if before != after {
            self.notify(&after);
        }
        after
    }

    fn notify(&self, snapshot: &SessionSnapshot) {
        let observers: Vec<SessionObserver> = self
            .lock_observers()
            .entries
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(snapshot);
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, SessionPhase> {
        self.phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_observers(&self) -> MutexGuard<'_, ObserverList> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    require_non_blank("email", email)?;
    require_present("password", password)
}
