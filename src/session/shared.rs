//! Shared session handle
//!
//! Edits are synchronous and refuse to wait: while a save holds the lock
//! they fail with `SaveInProgress`. Saves hold the lock for the whole round
//! trip to the store so no edit can slip in between diff and commit.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::{EditorError, EditorResult};
use crate::permissions::PermissionGraph;

use super::config::EditorConfig;
use super::diff::DiffSummary;
use super::session::EditSession;
use super::storage::PermissionStore;

/// Cloneable handle to one edit session
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<EditSession>>,
}

impl SharedSession {
    pub fn new(session: EditSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Load the graph from `store` and start a session on it
    pub async fn load(store: &dyn PermissionStore, config: EditorConfig) -> EditorResult<Self> {
        Self::load_with(store, config, |graph| graph).await
    }

    /// Load, reshape the graph (e.g. keep one page's targets), then start
    pub async fn load_with(
        store: &dyn PermissionStore,
        config: EditorConfig,
        shape: impl FnOnce(PermissionGraph) -> PermissionGraph,
    ) -> EditorResult<Self> {
        let graph = store
            .load()
            .await
            .map_err(|e| EditorError::LoadFailed(e.to_string()))?;
        let graph = shape(graph);

        tracing::info!(
            store = store.name(),
            revision = graph.revision,
            groups = graph.groups.len(),
            "Loaded permission graph"
        );
        Ok(Self::new(EditSession::from_graph(&graph, config)?))
    }

    /// Run a mutation, failing fast when a save holds the session
    pub fn try_edit<R>(
        &self,
        f: impl FnOnce(&mut EditSession) -> EditorResult<R>,
    ) -> EditorResult<R> {
        let mut session = self
            .inner
            .try_lock()
            .map_err(|_| EditorError::SaveInProgress)?;
        f(&mut session)
    }

    /// Read the session, waiting for an in-flight save to finish
    pub async fn read<R>(&self, f: impl FnOnce(&EditSession) -> R) -> R {
        let session = self.inner.lock().await;
        f(&session)
    }

    /// Whether a save currently holds the session
    pub fn is_saving(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Persist pending edits through `store`
    ///
    /// On success the session is committed and the persisted diff returned.
    /// On rejection or timeout nothing changes and the error carries the
    /// message to show. A clean session saves nothing.
    pub async fn commit(&self, store: &dyn PermissionStore) -> EditorResult<DiffSummary> {
        let mut session = self.inner.lock().await;
        if !session.has_unsaved_changes() {
            return Ok(DiffSummary::default());
        }

        let diff = session.diff()?;
        let timeout = session.config().save_timeout();

        match tokio::time::timeout(timeout, store.save(&diff)).await {
            Ok(Ok(())) => session.commit(),
            Ok(Err(err)) => {
                tracing::warn!(store = store.name(), error = %err, "Permission save rejected");
                Err(EditorError::rejected(err.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    store = store.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Permission save timed out"
                );
                Err(EditorError::rejected(format!(
                    "Save timed out after {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}
