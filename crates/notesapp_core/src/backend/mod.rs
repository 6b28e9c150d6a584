//! Collaborator ports for the remote auth provider and document store.
//!
//! # Responsibility
//! - Define the small async contracts core needs from the backend service.
//! - Provide one transport-neutral error type for every remote failure.
//!
//! # Invariants
//! - Adapters report "not logged in" as `RemoteErrorKind::Unauthorized`.
//! - Ports never validate user input; callers do that before any call.
//!
//! # See also
//! - `appwrite` for the HTTP adapter.

pub mod appwrite;
#[cfg(feature = "test-support")]
pub mod memory;

use crate::model::identity::Identity;
use crate::model::note::RawDocument;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Session id accepted by `delete_session` for "the caller's own session".
pub const CURRENT_SESSION: &str = "current";

/// Category of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// No active session, or credentials rejected.
    Unauthorized,
    NotFound,
    /// Entity already exists (e.g. duplicate account email).
    Conflict,
    InvalidRequest,
    RateLimited,
    Timeout,
    Server,
    Transport,
    /// Response body did not match the expected shape.
    Decode,
}

impl RemoteErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidRequest => "invalid_request",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Server => "server",
            Self::Transport => "transport",
            Self::Decode => "decode",
        }
    }
}

/// Failure reported by a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unauthorized, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Decode, message)
    }

    /// Whether re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::RateLimited
                | RemoteErrorKind::Timeout
                | RemoteErrorKind::Server
                | RemoteErrorKind::Transport
        )
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl Error for RemoteError {}

/// Session handle returned by a successful credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub session_id: String,
    pub user_id: String,
}

/// Auth collaborator contract.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Creates an account. Does not open a session.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity>;
    /// Exchanges credentials for a session.
    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<SessionTicket>;
    /// Returns the account bound to the active session.
    async fn get_account(&self) -> RemoteResult<Identity>;
    /// Terminates one session; pass [`CURRENT_SESSION`] for the active one.
    async fn delete_session(&self, session_id: &str) -> RemoteResult<()>;
}

/// Database + collection pair addressing one document collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub database_id: String,
    pub collection_id: String,
}

impl CollectionRef {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }
}

/// Server-side list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// Attribute equals the given string value.
    Equal { attribute: String, value: String },
    /// Sort descending by attribute.
    OrderDesc(String),
}

impl QueryFilter {
    pub fn equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self::OrderDesc(attribute.into())
    }
}

/// Document store collaborator contract.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(
        &self,
        collection: &CollectionRef,
        filters: &[QueryFilter],
    ) -> RemoteResult<Vec<RawDocument>>;
    async fn create(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        fields: &RawDocument,
    ) -> RemoteResult<RawDocument>;
    async fn update(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        fields: &RawDocument,
    ) -> RemoteResult<RawDocument>;
    async fn delete(&self, collection: &CollectionRef, document_id: &str) -> RemoteResult<()>;
}

/// Generates a client-side unique id accepted by the backend (`[a-z0-9]`, 32 chars).
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
