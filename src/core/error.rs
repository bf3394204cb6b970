//! Editor error types

use thiserror::Error;

/// Errors that can occur while editing a permission matrix
#[derive(Error, Debug)]
pub enum EditorError {
    /// The view layer referenced a scope that is not part of the loaded tree
    #[error("Scope not found: {0}")]
    ScopeNotFound(String),

    /// Group not found by id or name
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// A scope was inserted twice while building a tree
    #[error("Duplicate scope: {0}")]
    DuplicateScope(String),

    /// The loaded graph does not describe a well-formed tree
    #[error("Invalid permission graph: {0}")]
    InvalidGraph(String),

    /// The persistence collaborator could not supply a graph
    #[error("Failed to load permissions: {0}")]
    LoadFailed(String),

    /// The persistence collaborator refused the diff (or timed out)
    #[error("There was an error saving: {message}")]
    PersistenceRejected {
        /// Server-provided message, shown verbatim to the user
        message: String,
    },

    /// A save is in flight and holds the session
    #[error("Save in progress")]
    SaveInProgress,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EditorError {
    /// Create a scope-not-found error
    pub fn scope_not_found(scope: impl std::fmt::Display) -> Self {
        EditorError::ScopeNotFound(scope.to_string())
    }

    /// Create a persistence rejection
    pub fn rejected(message: impl Into<String>) -> Self {
        EditorError::PersistenceRejected {
            message: message.into(),
        }
    }

    /// Whether the user can recover from this error (retry or discard)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EditorError::PersistenceRejected { .. } | EditorError::SaveInProgress
        )
    }

    /// Title of the blocking dialog for recoverable errors
    pub fn dialog_title(&self) -> Option<&'static str> {
        match self {
            EditorError::PersistenceRejected { .. } => Some("There was an error saving"),
            _ => None,
        }
    }
}

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
