//! Login/register form state.
//!
//! # Responsibility
//! - Hold form fields, the current mode, and the inline error message.
//! - Validate locally before handing off to the session manager.
//!
//! # Invariants
//! - Local validation failures never reach the auth collaborator.
//! - Switching mode clears the inline error message.

use crate::backend::AuthGateway;
use crate::service::session_manager::{SessionManager, SessionSnapshot};

pub const MISSING_CREDENTIALS_MESSAGE: &str = "Email and password are required";
pub const MISSING_NAME_MESSAGE: &str = "Name is required for registration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Form state backing the auth screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    /// Only used in `AuthMode::Register`.
    pub name: String,
    error_message: Option<String>,
}

impl AuthForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.error_message = None;
    }

    /// Submits the form. On failure the inline message is set and `None`
    /// is returned; on success the new session snapshot is returned.
    pub async fn submit<A: AuthGateway>(
        &mut self,
        session: &SessionManager<A>,
    ) -> Option<SessionSnapshot> {
        self.error_message = None;

        if self.email.is_empty() || self.password.is_empty() {
            self.error_message = Some(MISSING_CREDENTIALS_MESSAGE.to_string());
            return None;
        }
        if self.mode == AuthMode::Register && self.name.trim().is_empty() {
            self.error_message = Some(MISSING_NAME_MESSAGE.to_string());
            return None;
        }

        let result = match self.mode {
            AuthMode::Login => session.login(&self.email, &self.password).await,
            AuthMode::Register => {
                session
                    .register(&self.email, &self.password, &self.name)
                    .await
            }
        };
        match result {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                self.error_message = Some(err.user_message());
                None
            }
        }
    }
}
