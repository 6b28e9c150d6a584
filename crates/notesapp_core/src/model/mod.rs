//! Client-side domain model for the notes app.
//!
//! # Responsibility
//! - Define the canonical shapes the rest of core works with.
//! - Isolate callers from the remote store's raw document schema.
//!
//! # Invariants
//! - Every `Note` id is assigned by the remote store and never changes.
//! - Local validation happens before any collaborator call.

pub mod identity;
pub mod note;
pub mod validation;
