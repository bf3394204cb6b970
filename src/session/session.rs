//! Edit session
//!
//! The `EditSession` owns the tree loaded for one permissions page and
//! tracks which scopes differ from the loaded snapshot. It is the only
//! place where current values change.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::core::{EditorResult, SessionState};
use crate::permissions::{
    Axis, DataAccess, NativeQuery, PermissionGraph, PermissionTree, PermissionValue,
    PermissionValues, Scope, Snapshot, TargetKind,
};
use crate::policy::{ConfirmationPolicy, ConfirmationRequirement};

use super::config::EditorConfig;
use super::diff::DiffSummary;

/// An edit waiting for the user to confirm it
///
/// Dropping it cancels the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub scope: Scope,
    pub value: PermissionValue,
    pub propagate: bool,
    pub confirmation: ConfirmationRequirement,
}

/// Result of asking the session to apply an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRequest {
    /// Applied right away; the scopes whose value changed (possibly none)
    Applied(Vec<Scope>),
    /// The policy wants a confirmation first
    NeedsConfirmation(PendingEdit),
}

/// What the view layer renders for one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    pub scope: Scope,
    pub label: String,
    pub kind: TargetKind,
    pub values: PermissionValues,
    /// Data access after database-wide grants and table mixes
    pub effective_data: Option<DataAccess>,
    pub is_dirty: bool,
    pub editable: bool,
}

/// Pending edits against one loaded permission tree
#[derive(Debug)]
pub struct EditSession {
    id: String,
    tree: PermissionTree,
    dirty: BTreeSet<Scope>,
    policy: ConfirmationPolicy,
    config: EditorConfig,
    revision: u64,
    loaded_at: DateTime<Utc>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl EditSession {
    /// Create a session over a freshly loaded tree
    pub fn new(tree: PermissionTree) -> Self {
        Self::with_config(tree, EditorConfig::default())
    }

    /// Create a session with a custom configuration
    pub fn with_config(tree: PermissionTree, config: EditorConfig) -> Self {
        let session = Self {
            id: uuid::Uuid::new_v4().to_string(),
            tree,
            dirty: BTreeSet::new(),
            policy: ConfirmationPolicy::from_config(&config),
            config,
            revision: 0,
            loaded_at: Utc::now(),
            last_saved_at: None,
        };
        tracing::info!(
            session_id = %session.id,
            nodes = session.tree.len(),
            "Permission edit session started"
        );
        session
    }

    /// Build the tree from a graph and start a session on it
    pub fn from_graph(graph: &PermissionGraph, config: EditorConfig) -> EditorResult<Self> {
        let mut session = Self::with_config(graph.to_tree()?, config);
        session.revision = graph.revision;
        Ok(session)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tree(&self) -> &PermissionTree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Graph revision this session is based on
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_dirty(self.has_unsaved_changes())
    }

    pub fn dirty_scopes(&self) -> &BTreeSet<Scope> {
        &self.dirty
    }

    pub fn is_dirty(&self, scope: &Scope) -> bool {
        self.dirty.contains(scope)
    }

    /// Everything the view needs to render one cell
    pub fn cell(&self, scope: &Scope) -> EditorResult<CellView> {
        let node = self.tree.get_node(scope)?;
        Ok(CellView {
            scope: scope.clone(),
            label: node.label().to_string(),
            kind: node.kind(),
            values: *node.current(),
            effective_data: self.tree.effective_data_access(scope, Snapshot::Pending)?,
            is_dirty: self.is_dirty(scope),
            editable: !self.tree.is_locked(scope),
        })
    }

    /// The diff a save would persist, without changing anything
    pub fn diff(&self) -> EditorResult<DiffSummary> {
        DiffSummary::compute(&self.tree, &self.dirty)
    }

    /// Commit-time confirmation; `None` when clean or disabled
    pub fn save_confirmation(&self) -> EditorResult<Option<ConfirmationRequirement>> {
        if !self.has_unsaved_changes() {
            return Ok(None);
        }
        Ok(self.policy.save_confirmation(&self.diff()?))
    }

    /// Navigation-away confirmation; `None` when clean
    pub fn navigation_confirmation(&self) -> Option<ConfirmationRequirement> {
        self.policy.navigation_confirmation(self.has_unsaved_changes())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Apply an edit unless the policy wants it confirmed first
    pub fn request_edit(
        &mut self,
        scope: &Scope,
        value: PermissionValue,
        propagate: bool,
    ) -> EditorResult<EditRequest> {
        let node = self.tree.get_node(scope)?;
        let kind = node.kind();
        // Tables compare against what the cell displays
        let old = match (kind, value) {
            (TargetKind::Table, PermissionValue::Data(_)) => self
                .tree
                .effective_data_access(scope, Snapshot::Pending)?
                .map(PermissionValue::Data),
            _ => node.current().get(value.axis()),
        };

        let confirmation = match old {
            Some(old) if old != value && !self.ignores(scope, value) => {
                self.confirmation_for(scope, kind, old, value)?
            }
            _ => None,
        };

        match confirmation {
            Some(confirmation) => {
                tracing::debug!(scope = %scope, %value, "Edit needs confirmation");
                Ok(EditRequest::NeedsConfirmation(PendingEdit {
                    scope: scope.clone(),
                    value,
                    propagate,
                    confirmation,
                }))
            }
            None => Ok(EditRequest::Applied(self.set_value(scope, value, propagate)?)),
        }
    }

    /// Apply an edit the user confirmed
    pub fn confirm_edit(&mut self, pending: PendingEdit) -> EditorResult<Vec<Scope>> {
        self.set_value(&pending.scope, pending.value, pending.propagate)
    }

    /// Set a value without consulting the policy
    ///
    /// Edits on administrator scopes, on axes the target does not carry and
    /// direct `Limited` data edits are ignored. Narrowing a table under a
    /// database-wide grant replaces the grant with explicit table grants.
    /// Returns the scopes whose value changed.
    pub fn set_value(
        &mut self,
        scope: &Scope,
        value: PermissionValue,
        propagate: bool,
    ) -> EditorResult<Vec<Scope>> {
        self.tree.get_node(scope)?;
        if self.tree.is_locked(scope) {
            tracing::debug!(scope = %scope, "Ignoring edit on administrators group");
            return Ok(Vec::new());
        }
        if value == PermissionValue::Data(DataAccess::Limited) {
            tracing::debug!(scope = %scope, "Limited access is derived from tables; ignoring edit");
            return Ok(Vec::new());
        }

        let mut changed = Vec::new();
        if let PermissionValue::Data(access) = value {
            if let Some(database) = self.tree.granting_database(scope)?.cloned() {
                if access == DataAccess::Allowed {
                    return Ok(Vec::new());
                }
                tracing::debug!(database = %database, table = %scope, "Splitting database grant");
                let tables: Vec<Scope> = self
                    .tree
                    .children_of(&database)?
                    .into_iter()
                    .cloned()
                    .collect();
                for table in tables.iter().filter(|t| *t != scope) {
                    self.apply(table, DataAccess::Allowed.into(), false, &mut changed)?;
                }
                self.apply(&database, DataAccess::NoAccess.into(), false, &mut changed)?;
            }
        }
        self.apply(scope, value, propagate, &mut changed)?;

        for touched in &changed {
            self.refresh_dirty(touched)?;
        }

        if !changed.is_empty() {
            tracing::debug!(
                scope = %scope,
                %value,
                changed = changed.len(),
                dirty = self.dirty.len(),
                "Applied permission edit"
            );
        }
        Ok(changed)
    }

    /// Revert every pending edit; safe to call on a clean session
    pub fn discard(&mut self) -> EditorResult<usize> {
        let dirty = std::mem::take(&mut self.dirty);
        for scope in &dirty {
            self.tree.reset(scope)?;
        }
        if !dirty.is_empty() {
            tracing::info!(session_id = %self.id, reverted = dirty.len(), "Discarded permission changes");
        }
        Ok(dirty.len())
    }

    /// Accept pending edits as persisted and return what was saved
    ///
    /// Call only after the store accepted the diff; on a rejected save the
    /// session must stay dirty.
    pub fn commit(&mut self) -> EditorResult<DiffSummary> {
        let diff = self.diff()?;
        let dirty = std::mem::take(&mut self.dirty);
        for scope in &dirty {
            self.tree.accept(scope)?;
        }
        if !dirty.is_empty() {
            self.revision += 1;
            self.last_saved_at = Some(Utc::now());
            tracing::info!(
                session_id = %self.id,
                changes = diff.len(),
                revision = self.revision,
                "Committed permission changes"
            );
        }
        Ok(diff)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ignores(&self, scope: &Scope, value: PermissionValue) -> bool {
        self.tree.is_locked(scope) || value == PermissionValue::Data(DataAccess::Limited)
    }

    /// Set one value plus the couplings it implies, collecting touched scopes
    fn apply(
        &mut self,
        scope: &Scope,
        value: PermissionValue,
        propagate: bool,
        changed: &mut Vec<Scope>,
    ) -> EditorResult<()> {
        let touched = self.tree.set_value(scope, value, propagate)?;
        let coupled = if !touched.is_empty() && self.tree.get_node(scope)?.kind() == TargetKind::Database {
            self.coupled_edits(scope, value)?
        } else {
            Vec::new()
        };
        merge(changed, touched);
        for coupled in coupled {
            merge(changed, self.tree.set_value(scope, coupled, false)?);
        }
        Ok(())
    }

    fn confirmation_for(
        &self,
        scope: &Scope,
        kind: TargetKind,
        old: PermissionValue,
        new: PermissionValue,
    ) -> EditorResult<Option<ConfirmationRequirement>> {
        if let Some(requirement) = self.policy.classify(kind, old, new) {
            return Ok(Some(requirement));
        }

        // A table edit can change what its database displays
        if let (TargetKind::Table, PermissionValue::Data(value)) = (kind, new) {
            if let Some((before, after)) = self.tree.project_table_edit(scope, value)? {
                return Ok(self.policy.classify(
                    TargetKind::Database,
                    PermissionValue::Data(before),
                    PermissionValue::Data(after),
                ));
            }
        }
        Ok(None)
    }

    /// Same-scope edits implied by a database edit
    fn coupled_edits(&self, scope: &Scope, value: PermissionValue) -> EditorResult<Vec<PermissionValue>> {
        let current = *self.tree.get_node(scope)?.current();
        let mut coupled = Vec::new();
        match value {
            // Native editing implies unrestricted data access
            PermissionValue::Native(NativeQuery::Allowed) => {
                coupled.push(PermissionValue::Data(DataAccess::Allowed));
            }
            PermissionValue::Data(access)
                if access < DataAccess::Allowed
                    && current.get(Axis::NativeQuery)
                        == Some(PermissionValue::Native(NativeQuery::Allowed)) =>
            {
                coupled.push(PermissionValue::Native(NativeQuery::Disallowed));
            }
            _ => {}
        }
        Ok(coupled)
    }

    fn refresh_dirty(&mut self, scope: &Scope) -> EditorResult<()> {
        if self.tree.get_node(scope)?.is_dirty() {
            self.dirty.insert(scope.clone());
        } else {
            self.dirty.remove(scope);
        }
        Ok(())
    }
}

fn merge(changed: &mut Vec<Scope>, touched: Vec<Scope>) {
    for scope in touched {
        if !changed.contains(&scope) {
            changed.push(scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EditorError;
    use crate::permissions::fixtures::{
        collection_tree, data_tree, ADMINISTRATORS, ALL_USERS, COLLECTION, DATA, NOSQL, READONLY,
        TABLES,
    };
    use crate::permissions::{CollectionAccess, GroupId};
    use crate::policy::ConfirmationKind;

    fn view() -> PermissionValue {
        CollectionAccess::View.into()
    }

    fn assert_matches_snapshot(session: &EditSession) {
        for node in session.tree().nodes() {
            assert_eq!(node.current(), node.original(), "{} not reverted", node.scope());
        }
    }

    #[test]
    fn test_discard_restores_snapshot() {
        let mut session = EditSession::new(collection_tree());
        session
            .set_value(&Scope::parse(ALL_USERS, "first"), view(), true)
            .unwrap();
        session
            .set_value(&Scope::parse(READONLY, "root"), CollectionAccess::Curate.into(), false)
            .unwrap();
        assert!(session.has_unsaved_changes());
        assert_eq!(session.state(), SessionState::Dirty);

        assert_eq!(session.discard().unwrap(), 4);
        assert!(!session.has_unsaved_changes());
        assert_matches_snapshot(&session);

        // Idempotent
        assert_eq!(session.discard().unwrap(), 0);
        assert_matches_snapshot(&session);
    }

    #[test]
    fn test_commit_resets_snapshot() {
        let mut session = EditSession::new(collection_tree());
        let first = Scope::parse(ALL_USERS, "first");
        session.set_value(&first, view(), true).unwrap();

        let diff = session.commit().unwrap();
        assert_eq!(diff.len(), 3);
        assert!(!session.has_unsaved_changes());
        assert_eq!(session.revision(), 1);
        assert!(session.last_saved_at().is_some());

        // Discard after commit changes nothing
        session.discard().unwrap();
        let node = session.tree().get_node(&first).unwrap();
        assert_eq!(node.current().collection, Some(CollectionAccess::View));
        assert_eq!(node.original().collection, Some(CollectionAccess::View));
    }

    #[test]
    fn test_setting_back_to_original_cleans_scope() {
        let mut session = EditSession::new(collection_tree());
        let root = Scope::parse(ALL_USERS, "root");
        session.set_value(&root, view(), false).unwrap();
        assert!(session.is_dirty(&root));

        session
            .set_value(&root, CollectionAccess::NoAccess.into(), false)
            .unwrap();
        assert!(!session.is_dirty(&root));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_repeated_set_is_idempotent() {
        let mut session = EditSession::new(collection_tree());
        let first = Scope::parse(ALL_USERS, "first");
        session.set_value(&first, view(), true).unwrap();
        let dirty = session.dirty_scopes().clone();

        let changed = session.set_value(&first, view(), true).unwrap();
        assert!(changed.is_empty());
        assert_eq!(session.dirty_scopes(), &dirty);
    }

    #[test]
    fn test_data_edit_touches_only_target() {
        let mut session = EditSession::new(data_tree());
        let orders = Scope::parse(READONLY, "1/orders");
        let changed = session
            .set_value(&orders, DataAccess::Allowed.into(), true)
            .unwrap();
        assert_eq!(changed, vec![orders.clone()]);
        assert_eq!(session.dirty_scopes().len(), 1);
    }

    #[test]
    fn test_admin_scopes_are_locked() {
        let mut session = EditSession::new(data_tree());
        let db = Scope::parse(ADMINISTRATORS, "1");
        let changed = session
            .set_value(&db, DataAccess::NoAccess.into(), false)
            .unwrap();
        assert!(changed.is_empty());

        let cell = session.cell(&db).unwrap();
        assert!(!cell.editable);
        assert_eq!(cell.effective_data, Some(DataAccess::Allowed));

        // No confirmation for an edit that will be ignored
        let request = session
            .request_edit(&db, DataAccess::Limited.into(), false)
            .unwrap();
        assert_eq!(request, EditRequest::Applied(Vec::new()));
    }

    #[test]
    fn test_unknown_scope_fails() {
        let mut session = EditSession::new(data_tree());
        let err = session
            .set_value(&Scope::parse(READONLY, "7"), DataAccess::Allowed.into(), false)
            .unwrap_err();
        assert!(matches!(err, EditorError::ScopeNotFound(_)));
    }

    #[test]
    fn test_readonly_orders_scenario() {
        let mut session = EditSession::new(data_tree());
        let orders = Scope::parse(READONLY, "1/orders");

        let pending = match session
            .request_edit(&orders, DataAccess::Allowed.into(), false)
            .unwrap()
        {
            EditRequest::NeedsConfirmation(pending) => pending,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(
            pending.confirmation.title,
            "Change access to this database to limited?"
        );
        // Nothing applied until confirmed
        assert!(!session.has_unsaved_changes());

        session.confirm_edit(pending).unwrap();
        let db = Scope::parse(READONLY, "1");
        assert_eq!(session.cell(&db).unwrap().effective_data, Some(DataAccess::Limited));

        session.commit().unwrap();
        let node = session.tree().get_node(&orders).unwrap();
        assert_eq!(node.current().data, Some(DataAccess::Allowed));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_collection_group_grant_scenario() {
        let mut session = EditSession::new(data_tree());
        let db = Scope::parse(COLLECTION, "1");
        let orders = Scope::parse(COLLECTION, "1/orders");

        if let EditRequest::NeedsConfirmation(pending) = session
            .request_edit(&orders, DataAccess::Allowed.into(), false)
            .unwrap()
        {
            session.confirm_edit(pending).unwrap();
        } else {
            panic!("granting one table should ask first");
        }

        let pending = match session
            .request_edit(&db, NativeQuery::Allowed.into(), false)
            .unwrap()
        {
            EditRequest::NeedsConfirmation(pending) => pending,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(pending.confirmation.kind, ConfirmationKind::AllowNativeQueries);
        session.confirm_edit(pending).unwrap();

        let cell = session.cell(&db).unwrap();
        assert_eq!(cell.effective_data, Some(DataAccess::Allowed));
        assert_eq!(cell.values.native, Some(NativeQuery::Allowed));
        for (id, _) in TABLES {
            let table = Scope::parse(COLLECTION, &format!("1/{}", id));
            assert_eq!(
                session.cell(&table).unwrap().effective_data,
                Some(DataAccess::Allowed)
            );
        }

        let save = session.save_confirmation().unwrap().unwrap();
        assert_eq!(save.title, "Save permissions?");
        assert!(save
            .messages
            .contains(&"collection will be given access to 4 tables in Sample Dataset.".to_string()));
        assert!(save.messages.contains(
            &"collection will now be able to write native queries for Sample Dataset.".to_string()
        ));

        session.commit().unwrap();
        assert!(session.save_confirmation().unwrap().is_none());
    }

    #[test]
    fn test_lowering_data_revokes_native() {
        let mut session = EditSession::new(data_tree());
        let db = Scope::parse(DATA, "1");

        let changed = session
            .set_value(&db, DataAccess::NoAccess.into(), false)
            .unwrap();
        assert_eq!(changed, vec![db.clone()]);

        let values = session.cell(&db).unwrap().values;
        assert_eq!(values.data, Some(DataAccess::NoAccess));
        assert_eq!(values.native, Some(NativeQuery::Disallowed));

        let diff = session.diff().unwrap();
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn test_collection_propagation_scenario() {
        let mut session = EditSession::new(collection_tree());
        let first = Scope::parse(ALL_USERS, "first");

        // Collection edits never ask per edit
        let request = session.request_edit(&first, view(), true).unwrap();
        assert!(matches!(request, EditRequest::Applied(ref changed) if changed.len() == 3));

        let second = Scope::parse(ALL_USERS, "first/second");
        let cell = session.cell(&second).unwrap();
        assert_eq!(cell.values.collection, Some(CollectionAccess::View));
        assert!(cell.is_dirty);

        // Curate on First without propagation leaves Second at View
        session
            .set_value(&first, CollectionAccess::Curate.into(), false)
            .unwrap();
        let cell = session.cell(&second).unwrap();
        assert_eq!(cell.values.collection, Some(CollectionAccess::View));

        let save = session.save_confirmation().unwrap().unwrap();
        assert_eq!(save.messages, vec!["Are you sure you want to do this?"]);
    }

    #[test]
    fn test_revoking_table_splits_database_grant() {
        let mut session = EditSession::new(data_tree());
        let db = Scope::parse(NOSQL, "1");
        let orders = Scope::parse(NOSQL, "1/orders");
        assert_eq!(session.cell(&orders).unwrap().effective_data, Some(DataAccess::Allowed));

        let pending = match session
            .request_edit(&orders, DataAccess::NoAccess.into(), false)
            .unwrap()
        {
            EditRequest::NeedsConfirmation(pending) => pending,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(
            pending.confirmation.title,
            "Change access to this database to limited?"
        );
        assert!(!session.has_unsaved_changes());

        let changed = session.confirm_edit(pending).unwrap();
        assert_eq!(changed.len(), 4);
        assert_eq!(session.cell(&orders).unwrap().effective_data, Some(DataAccess::NoAccess));
        assert_eq!(session.cell(&db).unwrap().effective_data, Some(DataAccess::Limited));
        for id in ["people", "products", "reviews"] {
            let table = Scope::parse(NOSQL, &format!("1/{}", id));
            let cell = session.cell(&table).unwrap();
            assert_eq!(cell.effective_data, Some(DataAccess::Allowed));
            assert!(cell.is_dirty);
        }
        assert_eq!(session.diff().unwrap().len(), 4);

        session.discard().unwrap();
        assert_eq!(session.cell(&orders).unwrap().effective_data, Some(DataAccess::Allowed));
    }

    #[test]
    fn test_split_grant_revokes_native() {
        let mut session = EditSession::new(data_tree());
        let db = Scope::parse(DATA, "1");
        session
            .set_value(&Scope::parse(DATA, "1/people"), DataAccess::NoAccess.into(), false)
            .unwrap();

        let cell = session.cell(&db).unwrap();
        assert_eq!(cell.values.native, Some(NativeQuery::Disallowed));
        assert_eq!(cell.effective_data, Some(DataAccess::Limited));
    }

    #[test]
    fn test_granting_covered_table_is_noop() {
        let mut session = EditSession::new(data_tree());
        let orders = Scope::parse(NOSQL, "1/orders");
        let request = session
            .request_edit(&orders, DataAccess::Allowed.into(), false)
            .unwrap();
        assert_eq!(request, EditRequest::Applied(Vec::new()));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_direct_limited_edit_is_ignored() {
        let mut session = EditSession::new(data_tree());
        let db = Scope::parse(READONLY, "1");

        let request = session
            .request_edit(&db, DataAccess::Limited.into(), false)
            .unwrap();
        assert_eq!(request, EditRequest::Applied(Vec::new()));

        let cell = session.cell(&db).unwrap();
        assert_eq!(cell.values.data, Some(DataAccess::NoAccess));
        assert_eq!(cell.effective_data, Some(DataAccess::NoAccess));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_from_graph_keeps_revision() {
        let mut graph = crate::permissions::fixtures::sample_data_graph();
        graph.revision = 7;
        let session = EditSession::from_graph(&graph, EditorConfig::default()).unwrap();
        assert_eq!(session.revision(), 7);
        assert_eq!(session.tree().groups().len(), 6);
        assert!(session.tree().group(GroupId(READONLY)).is_some());
    }
}
