//! Core types for the permission editor
//!
//! - `SessionState` - whether a session holds unsaved edits
//! - `EditorError` - error types

pub mod error;
pub mod state;

pub use error::{EditorError, EditorResult};
pub use state::SessionState;
