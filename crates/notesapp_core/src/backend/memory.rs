//! In-memory collaborator fake for tests.
//!
//! Behaves like the hosted backend closely enough for use-case tests:
//! server-assigned timestamps, one current session, owner filters and
//! newest-first sorting. Failures can be injected one call at a time.

use crate::backend::{
    AuthGateway, CollectionRef, DocumentStore, QueryFilter, RemoteError, RemoteErrorKind,
    RemoteResult, SessionTicket,
};
use crate::model::identity::Identity;
use crate::model::note::RawDocument;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One collaborator operation, used for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    CreateAccount,
    CreateSession,
    GetAccount,
    DeleteSession,
    List,
    Create,
    Update,
    Delete,
}

struct Account {
    identity: Identity,
    password: String,
}

struct StoredDocument {
    collection: CollectionRef,
    fields: RawDocument,
}

#[derive(Default)]
struct MemoryState {
    accounts: Vec<Account>,
    session: Option<SessionTicket>,
    documents: Vec<StoredDocument>,
    clock: u64,
    failures: HashMap<BackendCall, RemoteError>,
    calls: HashMap<BackendCall, usize>,
    ignore_filters: bool,
}

impl MemoryState {
    fn enter(&mut self, call: BackendCall) -> RemoteResult<()> {
        *self.calls.entry(call).or_default() += 1;
        match self.failures.remove(&call) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn require_session(&self) -> RemoteResult<&SessionTicket> {
        self.session
            .as_ref()
            .ok_or_else(|| RemoteError::unauthorized("user (role: guests) missing scope"))
    }

    fn tick(&mut self) -> String {
        self.clock += 1;
        format!("2000-01-01T00:00:00.{:06}+00:00", self.clock)
    }

    fn position(&self, collection: &CollectionRef, document_id: &str) -> Option<usize> {
        self.documents.iter().position(|doc| {
            doc.collection == *collection
                && doc.fields.get("$id").and_then(Value::as_str) == Some(document_id)
        })
    }
}

/// Shared in-memory backend. Clones observe the same state.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; keep serving.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next call of `call` fail with `error`.
    pub fn fail_next(&self, call: BackendCall, error: RemoteError) {
        self.state().failures.insert(call, error);
    }

    /// Number of times `call` reached the backend, failures included.
    pub fn calls(&self, call: BackendCall) -> usize {
        self.state().calls.get(&call).copied().unwrap_or(0)
    }

    /// Makes `list` return every document regardless of filters.
    pub fn ignore_filters(&self, ignore: bool) {
        self.state().ignore_filters = ignore;
    }

    /// Creates an account and opens a session for it.
    pub fn with_signed_in_user(&self, email: &str, password: &str, name: &str) -> Identity {
        let identity = Identity::new(super::unique_id(), email, name);
        let mut state = self.state();
        state.accounts.push(Account {
            identity: identity.clone(),
            password: password.to_string(),
        });
        state.session = Some(SessionTicket {
            session_id: super::unique_id(),
            user_id: identity.id.clone(),
        });
        identity
    }

    /// Inserts a document directly, bypassing session checks. Returns its id.
    pub fn insert_document(&self, collection: &CollectionRef, mut fields: RawDocument) -> String {
        let mut state = self.state();
        let id = super::unique_id();
        let stamp = state.tick();
        fields.insert("$id".to_string(), Value::String(id.clone()));
        fields.insert("$createdAt".to_string(), Value::String(stamp.clone()));
        fields.insert("$updatedAt".to_string(), Value::String(stamp));
        state.documents.push(StoredDocument {
            collection: collection.clone(),
            fields,
        });
        id
    }

    /// Whether any session is currently open.
    pub fn has_session(&self) -> bool {
        self.state().session.is_some()
    }
}

#[async_trait]
impl AuthGateway for InMemoryBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity> {
        let mut state = self.state();
        state.enter(BackendCall::CreateAccount)?;
        if state
            .accounts
            .iter()
            .any(|account| account.identity.email == email)
        {
            return Err(RemoteError::new(
                RemoteErrorKind::Conflict,
                "A user with the same email already exists.",
            ));
        }
        let identity = Identity::new(super::unique_id(), email, name);
        state.accounts.push(Account {
            identity: identity.clone(),
            password: password.to_string(),
        });
        Ok(identity)
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<SessionTicket> {
        let mut state = self.state();
        state.enter(BackendCall::CreateSession)?;
        let user_id = state
            .accounts
            .iter()
            .find(|account| account.identity.email == email && account.password == password)
            .map(|account| account.identity.id.clone())
            .ok_or_else(|| RemoteError::unauthorized("Invalid credentials."))?;
        let ticket = SessionTicket {
            session_id: super::unique_id(),
            user_id,
        };
        state.session = Some(ticket.clone());
        Ok(ticket)
    }

    async fn get_account(&self) -> RemoteResult<Identity> {
        let mut state = self.state();
        state.enter(BackendCall::GetAccount)?;
        let user_id = state.require_session()?.user_id.clone();
        state
            .accounts
            .iter()
            .find(|account| account.identity.id == user_id)
            .map(|account| account.identity.clone())
            .ok_or_else(|| RemoteError::unauthorized("session user no longer exists"))
    }

    async fn delete_session(&self, session_id: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.enter(BackendCall::DeleteSession)?;
        let current = state.require_session()?.session_id.clone();
        if session_id != super::CURRENT_SESSION && session_id != current {
            return Err(RemoteError::new(
                RemoteErrorKind::NotFound,
                "Session with the requested ID could not be found.",
            ));
        }
        state.session = None;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryBackend {
    async fn list(
        &self,
        collection: &CollectionRef,
        filters: &[QueryFilter],
    ) -> RemoteResult<Vec<RawDocument>> {
        let mut state = self.state();
        state.enter(BackendCall::List)?;
        state.require_session()?;

        let mut docs: Vec<RawDocument> = state
            .documents
            .iter()
            .filter(|doc| doc.collection == *collection)
            .map(|doc| doc.fields.clone())
            .collect();
        if state.ignore_filters {
            return Ok(docs);
        }

        for filter in filters {
            match filter {
                QueryFilter::Equal { attribute, value } => docs.retain(|doc| {
                    doc.get(attribute).and_then(Value::as_str) == Some(value.as_str())
                }),
                QueryFilter::OrderDesc(attribute) => docs.sort_by(|a, b| {
                    let left = a.get(attribute).and_then(Value::as_str);
                    let right = b.get(attribute).and_then(Value::as_str);
                    right.cmp(&left)
                }),
            }
        }
        Ok(docs)
    }

    async fn create(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        fields: &RawDocument,
    ) -> RemoteResult<RawDocument> {
        let mut state = self.state();
        state.enter(BackendCall::Create)?;
        state.require_session()?;
        if state.position(collection, document_id).is_some() {
            return Err(RemoteError::new(
                RemoteErrorKind::Conflict,
                "Document with the requested ID already exists.",
            ));
        }

        let stamp = state.tick();
        let mut stored = fields.clone();
        stored.insert("$id".to_string(), Value::String(document_id.to_string()));
        stored.insert("$createdAt".to_string(), Value::String(stamp.clone()));
        stored.insert("$updatedAt".to_string(), Value::String(stamp));
        state.documents.push(StoredDocument {
            collection: collection.clone(),
            fields: stored.clone(),
        });
        Ok(stored)
    }

    async fn update(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        fields: &RawDocument,
    ) -> RemoteResult<RawDocument> {
        let mut state = self.state();
        state.enter(BackendCall::Update)?;
        state.require_session()?;
        let index = state
            .position(collection, document_id)
            .ok_or_else(|| document_not_found(document_id))?;

        let stamp = state.tick();
        let stored = &mut state.documents[index].fields;
        for (key, value) in fields {
            stored.insert(key.clone(), value.clone());
        }
        stored.insert("$updatedAt".to_string(), Value::String(stamp));
        Ok(stored.clone())
    }

    async fn delete(&self, collection: &CollectionRef, document_id: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.enter(BackendCall::Delete)?;
        state.require_session()?;
        let index = state
            .position(collection, document_id)
            .ok_or_else(|| document_not_found(document_id))?;
        state.documents.remove(index);
        Ok(())
    }
}

fn document_not_found(document_id: &str) -> RemoteError {
    RemoteError::new(
        RemoteErrorKind::NotFound,
        format!("Document with the requested ID `{document_id}` could not be found."),
    )
}
