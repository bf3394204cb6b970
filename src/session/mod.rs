//! Editing sessions
//!
//! This module provides `EditSession` for pending edits against a loaded
//! permission tree, the `DiffSummary` a save persists, and the stores that
//! load and persist graphs.
//!
//! `SharedSession` wraps a session for async callers: edits fail fast while
//! a save is in flight, and a save only commits once the store accepted it.

mod config;
mod diff;
mod session;
mod shared;
mod storage;

pub use config::EditorConfig;
pub use diff::{DiffEntry, DiffSummary, GrantSummary};
pub use session::{CellView, EditRequest, EditSession, PendingEdit};
pub use shared::SharedSession;
pub use storage::{FileGraphStore, InMemoryStore, PermissionStore, RevisionRecord};
