//! Edit session state types

use serde::{Deserialize, Serialize};

/// Whether a session holds edits that have not been persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Current values match the loaded snapshot
    #[default]
    Clean,

    /// At least one scope differs from the loaded snapshot
    Dirty,
}

impl SessionState {
    /// State for the given dirty-set emptiness
    pub fn from_dirty(has_changes: bool) -> Self {
        if has_changes {
            SessionState::Dirty
        } else {
            SessionState::Clean
        }
    }

    /// Check if navigation away has to be intercepted
    pub fn is_dirty(&self) -> bool {
        matches!(self, SessionState::Dirty)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Clean => write!(f, "Clean"),
            SessionState::Dirty => write!(f, "You've made changes to permissions."),
        }
    }
}
