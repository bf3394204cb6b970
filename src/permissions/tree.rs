//! Permission tree
//!
//! The tree owns every node. Parent/child links are node indices into the
//! same arena, so there is no shared mutable state between nodes.

use std::collections::HashMap;

use crate::core::{EditorError, EditorResult};

use super::scope::{Group, GroupId, Scope, TargetKind};
use super::value::{Axis, DataAccess, PermissionValue, PermissionValues};

/// Index of a node inside its tree
pub type NodeId = usize;

/// Which side of a node to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    /// Values as last loaded or persisted
    Original,
    /// Values including pending edits
    Pending,
}

/// A single permission cell
#[derive(Debug, Clone)]
pub struct PermissionNode {
    scope: Scope,
    kind: TargetKind,
    label: String,
    current: PermissionValues,
    original: PermissionValues,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl PermissionNode {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Display name of the target (e.g. "Sample Dataset")
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Values including pending edits
    pub fn current(&self) -> &PermissionValues {
        &self.current
    }

    /// Values as last loaded or persisted
    pub fn original(&self) -> &PermissionValues {
        &self.original
    }

    pub fn values(&self, snapshot: Snapshot) -> &PermissionValues {
        match snapshot {
            Snapshot::Original => &self.original,
            Snapshot::Pending => &self.current,
        }
    }

    /// Current differs from original
    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Hierarchical container of permission nodes for every group
#[derive(Debug, Clone, Default)]
pub struct PermissionTree {
    groups: Vec<Group>,
    nodes: Vec<PermissionNode>,
    index: HashMap<Scope, NodeId>,
}

impl PermissionTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group; scopes can only be inserted for known groups
    pub fn add_group(&mut self, group: Group) -> EditorResult<()> {
        if self.group(group.id).is_some() {
            return Err(EditorError::InvalidGraph(format!(
                "group {} listed twice",
                group.id
            )));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Insert a node under `parent` (or as a root)
    ///
    /// Values are normalized to the axes the target kind supports: missing
    /// axes start at their lowest level and foreign axes are dropped.
    pub fn insert(
        &mut self,
        scope: Scope,
        kind: TargetKind,
        label: impl Into<String>,
        parent: Option<&Scope>,
        values: PermissionValues,
    ) -> EditorResult<NodeId> {
        if self.group(scope.group).is_none() {
            return Err(EditorError::GroupNotFound(scope.group.to_string()));
        }
        if self.index.contains_key(&scope) {
            return Err(EditorError::DuplicateScope(scope.to_string()));
        }

        let parent_id = match parent {
            Some(parent_scope) => {
                let id = self.node_id(parent_scope)?;
                if parent_scope.group != scope.group {
                    return Err(EditorError::InvalidGraph(format!(
                        "{} and its parent {} belong to different groups",
                        scope, parent_scope
                    )));
                }
                Some(id)
            }
            None => None,
        };

        let values = normalize(kind, values);
        let id = self.nodes.len();
        self.nodes.push(PermissionNode {
            scope: scope.clone(),
            kind,
            label: label.into(),
            current: values,
            original: values,
            parent: parent_id,
            children: Vec::new(),
        });
        if let Some(parent_id) = parent_id {
            self.nodes[parent_id].children.push(id);
        }
        self.index.insert(scope, id);

        Ok(id)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// All groups in display order
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_by_name(&self, name: &str) -> EditorResult<&Group> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| EditorError::GroupNotFound(name.to_string()))
    }

    /// Groups matching the sidebar search box, display order preserved
    pub fn filter_groups(&self, query: &str) -> Vec<&Group> {
        self.groups
            .iter()
            .filter(|g| g.matches_filter(query))
            .collect()
    }

    /// Whether the scope belongs to a locked administrators group
    pub fn is_locked(&self, scope: &Scope) -> bool {
        self.group(scope.group).map(|g| g.is_admin).unwrap_or(false)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn contains(&self, scope: &Scope) -> bool {
        self.index.contains_key(scope)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node or fail with `ScopeNotFound`
    pub fn get_node(&self, scope: &Scope) -> EditorResult<&PermissionNode> {
        self.node_id(scope).map(|id| &self.nodes[id])
    }

    /// Direct children in load order
    pub fn children_of(&self, scope: &Scope) -> EditorResult<Vec<&Scope>> {
        let id = self.node_id(scope)?;
        Ok(self.nodes[id]
            .children
            .iter()
            .map(|child| &self.nodes[*child].scope)
            .collect())
    }

    pub fn parent_of(&self, scope: &Scope) -> EditorResult<Option<&Scope>> {
        let id = self.node_id(scope)?;
        Ok(self.nodes[id].parent.map(|p| &self.nodes[p].scope))
    }

    /// All descendants in depth-first display order (excluding `scope`)
    pub fn descendants_of(&self, scope: &Scope) -> EditorResult<Vec<&Scope>> {
        let id = self.node_id(scope)?;
        Ok(self
            .subtree(id)
            .into_iter()
            .skip(1)
            .map(|n| &self.nodes[n].scope)
            .collect())
    }

    /// Top-level scopes of one group in load order
    pub fn roots(&self, group: GroupId) -> Vec<&Scope> {
        self.nodes
            .iter()
            .filter(|n| n.scope.group == group && n.is_root())
            .map(|n| &n.scope)
            .collect()
    }

    /// Every node in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &PermissionNode> {
        self.nodes.iter()
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// Data access a cell displays once database-wide grants and mixed
    /// table access are taken into account
    ///
    /// Returns `None` for collection scopes.
    pub fn effective_data_access(
        &self,
        scope: &Scope,
        snapshot: Snapshot,
    ) -> EditorResult<Option<DataAccess>> {
        let id = self.node_id(scope)?;
        Ok(self.effective_data_access_of(id, snapshot))
    }

    fn effective_data_access_of(&self, id: NodeId, snapshot: Snapshot) -> Option<DataAccess> {
        let node = &self.nodes[id];
        let own = node.values(snapshot).data;

        match node.kind {
            TargetKind::Collection => None,
            TargetKind::Table => {
                let database_grant = node
                    .parent
                    .and_then(|p| self.nodes[p].values(snapshot).data);
                if database_grant == Some(DataAccess::Allowed) {
                    Some(DataAccess::Allowed)
                } else {
                    own
                }
            }
            TargetKind::Database => {
                let tables: Vec<DataAccess> = self
                    .tables_of(id)
                    .map(|c| c.values(snapshot).data.unwrap_or_default())
                    .collect();
                aggregate_database(own, &tables)
            }
        }
    }

    /// Effective access of a table's database before and after setting the
    /// table to `value` (pending snapshot)
    ///
    /// Narrowing a table under a database-wide grant splits the grant: the
    /// database drops to `NoAccess` and every other table keeps `Allowed`.
    /// Returns `None` when the scope is not a table under a database.
    pub fn project_table_edit(
        &self,
        table: &Scope,
        value: DataAccess,
    ) -> EditorResult<Option<(DataAccess, DataAccess)>> {
        let database = match self.covering_database(table)? {
            Some(database) => database,
            None => return Ok(None),
        };

        let own = self.nodes[database].current.data;
        let splits = own == Some(DataAccess::Allowed) && value != DataAccess::Allowed;
        let before: Vec<DataAccess> = self
            .tables_of(database)
            .map(|t| t.current.data.unwrap_or_default())
            .collect();
        let after: Vec<DataAccess> = self
            .tables_of(database)
            .map(|t| {
                if t.scope == *table {
                    value
                } else if splits {
                    DataAccess::Allowed
                } else {
                    t.current.data.unwrap_or_default()
                }
            })
            .collect();
        let after_own = if splits { Some(DataAccess::NoAccess) } else { own };

        Ok(aggregate_database(own, &before).zip(aggregate_database(after_own, &after)))
    }

    /// The database whose own grant currently covers `table`, if any
    pub fn granting_database(&self, table: &Scope) -> EditorResult<Option<&Scope>> {
        Ok(self.covering_database(table)?.and_then(|database| {
            let node = &self.nodes[database];
            (node.current.data == Some(DataAccess::Allowed)).then_some(&node.scope)
        }))
    }

    fn covering_database(&self, table: &Scope) -> EditorResult<Option<NodeId>> {
        let node = &self.nodes[self.node_id(table)?];
        Ok(match (node.kind, node.parent) {
            (TargetKind::Table, Some(parent)) if self.nodes[parent].kind == TargetKind::Database => {
                Some(parent)
            }
            _ => None,
        })
    }

    fn tables_of(&self, database: NodeId) -> impl Iterator<Item = &PermissionNode> {
        self.nodes[database]
            .children
            .iter()
            .map(move |c| &self.nodes[*c])
            .filter(|c| c.kind == TargetKind::Table)
    }

    // =========================================================================
    // Mutation (EditSession only)
    // =========================================================================

    /// Set one axis on `scope`, optionally copying it to every descendant
    ///
    /// Only collection-axis edits propagate; the flag is ignored otherwise.
    /// Returns the scopes whose current value changed.
    pub(crate) fn set_value(
        &mut self,
        scope: &Scope,
        value: PermissionValue,
        propagate: bool,
    ) -> EditorResult<Vec<Scope>> {
        let id = self.node_id(scope)?;
        let axis = value.axis();

        if !self.nodes[id].kind.supports(axis) {
            tracing::debug!(scope = %scope, %axis, "Ignoring edit on unsupported axis");
            return Ok(Vec::new());
        }
        if self.nodes[id].current.get(axis) == Some(value) {
            return Ok(Vec::new());
        }

        let targets = if propagate && axis == Axis::Collection {
            self.subtree(id)
        } else {
            if propagate {
                tracing::debug!(scope = %scope, %axis, "Propagation only applies to collections");
            }
            vec![id]
        };

        let mut changed = Vec::new();
        for target in targets {
            let node = &mut self.nodes[target];
            if node.kind.supports(axis) && node.current.get(axis) != Some(value) {
                node.current.set(value);
                changed.push(node.scope.clone());
            }
        }

        if changed.len() > 1 {
            tracing::debug!(scope = %scope, affected = changed.len(), "Propagated collection edit");
        }

        Ok(changed)
    }

    /// Revert a node to its original values
    pub(crate) fn reset(&mut self, scope: &Scope) -> EditorResult<()> {
        let id = self.node_id(scope)?;
        let node = &mut self.nodes[id];
        node.current = node.original;
        Ok(())
    }

    /// Accept a node's current values as the new original
    pub(crate) fn accept(&mut self, scope: &Scope) -> EditorResult<()> {
        let id = self.node_id(scope)?;
        let node = &mut self.nodes[id];
        node.original = node.current;
        Ok(())
    }

    fn node_id(&self, scope: &Scope) -> EditorResult<NodeId> {
        self.index
            .get(scope)
            .copied()
            .ok_or_else(|| EditorError::scope_not_found(scope))
    }

    /// `id` followed by all of its descendants, depth first
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            // Reverse so the first child is visited first
            stack.extend(self.nodes[next].children.iter().rev());
        }
        out
    }
}

/// A database-wide grant wins; otherwise the tables decide
fn aggregate_database(own: Option<DataAccess>, tables: &[DataAccess]) -> Option<DataAccess> {
    if own == Some(DataAccess::Allowed) || tables.is_empty() {
        own
    } else if tables.iter().all(|t| *t == DataAccess::Allowed) {
        Some(DataAccess::Allowed)
    } else if tables.iter().all(|t| *t == DataAccess::NoAccess) {
        Some(DataAccess::NoAccess)
    } else {
        Some(DataAccess::Limited)
    }
}

fn normalize(kind: TargetKind, values: PermissionValues) -> PermissionValues {
    PermissionValues {
        data: kind
            .supports(Axis::DataAccess)
            .then(|| values.data.unwrap_or_default()),
        native: kind
            .supports(Axis::NativeQuery)
            .then(|| values.native.unwrap_or_default()),
        collection: kind
            .supports(Axis::Collection)
            .then(|| values.collection.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::fixtures::{collection_tree, data_tree, ALL_USERS, READONLY};
    use crate::permissions::value::{CollectionAccess, NativeQuery};

    fn view() -> PermissionValue {
        PermissionValue::Collection(CollectionAccess::View)
    }

    #[test]
    fn test_get_node_and_missing_scope() {
        let tree = collection_tree();
        let node = tree.get_node(&Scope::parse(READONLY, "first/second")).unwrap();
        assert_eq!(node.label(), "Second collection");
        assert_eq!(node.current().collection, Some(CollectionAccess::View));

        let err = tree.get_node(&Scope::parse(READONLY, "missing")).unwrap_err();
        assert!(matches!(err, EditorError::ScopeNotFound(_)));
    }

    #[test]
    fn test_children_in_load_order() {
        let tree = data_tree();
        let children = tree.children_of(&Scope::parse(READONLY, "1")).unwrap();
        let labels: Vec<&str> = children
            .iter()
            .map(|s| tree.get_node(s).unwrap().label())
            .collect();
        assert_eq!(labels, vec!["Orders", "People", "Products", "Reviews"]);
    }

    #[test]
    fn test_parent_and_roots() {
        let tree = collection_tree();
        let third = Scope::parse(ALL_USERS, "first/second/third");
        assert_eq!(
            tree.parent_of(&third).unwrap(),
            Some(&Scope::parse(ALL_USERS, "first/second"))
        );
        assert_eq!(tree.roots(crate::permissions::GroupId(ALL_USERS)).len(), 2);
    }

    #[test]
    fn test_insert_rejects_duplicates_and_unknown_groups() {
        let mut tree = PermissionTree::new();
        tree.add_group(Group::new(1, "All Users")).unwrap();
        let scope = Scope::parse(1, "root");
        tree.insert(scope.clone(), TargetKind::Collection, "Our analytics", None, Default::default())
            .unwrap();

        let dup = tree.insert(scope, TargetKind::Collection, "again", None, Default::default());
        assert!(matches!(dup, Err(EditorError::DuplicateScope(_))));

        let unknown = tree.insert(
            Scope::parse(9, "root"),
            TargetKind::Collection,
            "Our analytics",
            None,
            Default::default(),
        );
        assert!(matches!(unknown, Err(EditorError::GroupNotFound(_))));
    }

    #[test]
    fn test_normalize_fills_supported_axes() {
        let tree = data_tree();
        let table = tree.get_node(&Scope::parse(READONLY, "1/orders")).unwrap();
        assert_eq!(table.current().data, Some(DataAccess::NoAccess));
        assert_eq!(table.current().native, None);
        assert_eq!(table.current().collection, None);
    }

    #[test]
    fn test_propagation_reaches_descendants_only() {
        let mut tree = collection_tree();
        let first = Scope::parse(ALL_USERS, "first");

        let changed = tree.set_value(&first, view(), true).unwrap();
        assert_eq!(changed.len(), 3);

        for path in ["first", "first/second", "first/second/third"] {
            let node = tree.get_node(&Scope::parse(ALL_USERS, path)).unwrap();
            assert_eq!(node.current().collection, Some(CollectionAccess::View));
            assert!(node.is_dirty());
        }

        // Sibling root untouched
        let root = tree.get_node(&Scope::parse(ALL_USERS, "root")).unwrap();
        assert!(!root.is_dirty());
    }

    #[test]
    fn test_propagation_leaves_ancestors_alone() {
        let mut tree = collection_tree();
        let second = Scope::parse(ALL_USERS, "first/second");
        tree.set_value(&second, view(), true).unwrap();

        assert!(!tree.get_node(&Scope::parse(ALL_USERS, "first")).unwrap().is_dirty());
        assert!(tree
            .get_node(&Scope::parse(ALL_USERS, "first/second/third"))
            .unwrap()
            .is_dirty());
    }

    #[test]
    fn test_data_edits_never_propagate() {
        let mut tree = data_tree();
        let db = Scope::parse(READONLY, "1");
        let changed = tree
            .set_value(&db, PermissionValue::Data(DataAccess::Allowed), true)
            .unwrap();
        assert_eq!(changed, vec![db.clone()]);

        for table in tree.children_of(&db).unwrap() {
            assert!(!tree.get_node(table).unwrap().is_dirty());
        }
    }

    #[test]
    fn test_same_value_is_noop() {
        let mut tree = collection_tree();
        let second = Scope::parse(READONLY, "first/second");
        // readonly already has View here; no propagation to third either
        let changed = tree.set_value(&second, view(), true).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn test_unsupported_axis_ignored() {
        let mut tree = data_tree();
        let table = Scope::parse(READONLY, "1/orders");
        let changed = tree
            .set_value(&table, PermissionValue::Native(NativeQuery::Allowed), false)
            .unwrap();
        assert!(changed.is_empty());
        assert_eq!(tree.get_node(&table).unwrap().current().native, None);
    }

    #[test]
    fn test_effective_database_access() {
        let mut tree = data_tree();
        let db = Scope::parse(READONLY, "1");
        let orders = Scope::parse(READONLY, "1/orders");

        assert_eq!(
            tree.effective_data_access(&db, Snapshot::Pending).unwrap(),
            Some(DataAccess::NoAccess)
        );

        tree.set_value(&orders, DataAccess::Allowed.into(), false).unwrap();
        assert_eq!(
            tree.effective_data_access(&db, Snapshot::Pending).unwrap(),
            Some(DataAccess::Limited)
        );
        assert_eq!(
            tree.effective_data_access(&db, Snapshot::Original).unwrap(),
            Some(DataAccess::NoAccess)
        );

        // A database-wide grant covers every table
        tree.set_value(&db, DataAccess::Allowed.into(), false).unwrap();
        let people = Scope::parse(READONLY, "1/people");
        assert_eq!(
            tree.effective_data_access(&people, Snapshot::Pending).unwrap(),
            Some(DataAccess::Allowed)
        );
    }

    #[test]
    fn test_project_table_edit() {
        let tree = data_tree();
        let orders = Scope::parse(READONLY, "1/orders");
        assert_eq!(
            tree.project_table_edit(&orders, DataAccess::Allowed).unwrap(),
            Some((DataAccess::NoAccess, DataAccess::Limited))
        );

        // Databases themselves have no projection
        let db = Scope::parse(READONLY, "1");
        assert_eq!(tree.project_table_edit(&db, DataAccess::Allowed).unwrap(), None);

        // Revoking one table under a database-wide grant leaves the rest
        let nosql_orders = Scope::parse(crate::permissions::fixtures::NOSQL, "1/orders");
        assert_eq!(
            tree.project_table_edit(&nosql_orders, DataAccess::NoAccess).unwrap(),
            Some((DataAccess::Allowed, DataAccess::Limited))
        );
        assert_eq!(
            tree.project_table_edit(&nosql_orders, DataAccess::Allowed).unwrap(),
            Some((DataAccess::Allowed, DataAccess::Allowed))
        );
    }

    #[test]
    fn test_granting_database() {
        let tree = data_tree();
        let nosql_orders = Scope::parse(crate::permissions::fixtures::NOSQL, "1/orders");
        assert_eq!(
            tree.granting_database(&nosql_orders).unwrap(),
            Some(&Scope::parse(crate::permissions::fixtures::NOSQL, "1"))
        );
        assert_eq!(
            tree.granting_database(&Scope::parse(READONLY, "1/orders")).unwrap(),
            None
        );
        assert_eq!(tree.granting_database(&Scope::parse(READONLY, "1")).unwrap(), None);
    }

    #[test]
    fn test_reset_and_accept() {
        let mut tree = collection_tree();
        let first = Scope::parse(ALL_USERS, "first");
        tree.set_value(&first, view(), false).unwrap();

        tree.reset(&first).unwrap();
        assert!(!tree.get_node(&first).unwrap().is_dirty());

        tree.set_value(&first, view(), false).unwrap();
        tree.accept(&first).unwrap();
        let node = tree.get_node(&first).unwrap();
        assert!(!node.is_dirty());
        assert_eq!(node.original().collection, Some(CollectionAccess::View));
    }

    #[test]
    fn test_filter_groups() {
        let tree = data_tree();
        let names: Vec<&str> = tree.filter_groups("A").iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Administrators", "All Users", "data", "readonly"]);
        assert!(tree.group_by_name("nosql").is_ok());
        assert!(tree.group_by_name("nobody").is_err());
    }
}
