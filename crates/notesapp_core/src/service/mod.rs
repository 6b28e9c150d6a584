//! Core use-case services.
//!
//! # Responsibility
//! - Own session state and the note list on behalf of the presentation layer.
//! - Keep UI/FFI layers decoupled from collaborator details.

pub mod auth_form;
pub mod note_editor;
pub mod note_list;
pub mod session_manager;
