//! Permission graph load/save format
//!
//! The graph is what the persistence collaborator hands over on load: the
//! groups, the nested target hierarchy, and per-group grants keyed by the
//! `/`-joined target path.
//!
//! ```json
//! {
//!   "revision": 4,
//!   "groups": [{ "id": 1, "name": "All Users", "member_count": 3 }],
//!   "targets": [{ "id": "1", "name": "Sample Dataset", "kind": "database",
//!                 "children": [{ "id": "orders", "name": "Orders", "kind": "table" }] }],
//!   "grants": { "1": { "1": { "data": "allowed", "native": "disallowed" } } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{EditorError, EditorResult};
use crate::session::DiffSummary;

use super::scope::{Group, GroupId, Scope, TargetKind, TargetPath};
use super::tree::PermissionTree;
use super::value::PermissionValues;

/// One target in the hierarchy, with its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: String,
    pub name: String,
    pub kind: TargetKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TargetSpec>,
}

impl TargetSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    /// Add a child target
    pub fn with_child(mut self, child: TargetSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// Serialized permission graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionGraph {
    /// Incremented by the store on every accepted save
    #[serde(default)]
    pub revision: u64,

    pub groups: Vec<Group>,

    pub targets: Vec<TargetSpec>,

    /// group -> target path -> values; missing entries default to the
    /// lowest level of every applicable axis
    #[serde(default)]
    pub grants: BTreeMap<GroupId, BTreeMap<String, PermissionValues>>,
}

impl PermissionGraph {
    /// Read the grant for one group and path, if present
    pub fn grant(&self, group: GroupId, path: &TargetPath) -> Option<&PermissionValues> {
        self.grants.get(&group).and_then(|g| g.get(&path.key()))
    }

    /// Set a grant
    pub fn set_grant(&mut self, group: GroupId, path: &TargetPath, values: PermissionValues) {
        self.grants
            .entry(group)
            .or_default()
            .insert(path.key(), values);
    }

    /// Build the tree: every group gets one node per target
    pub fn to_tree(&self) -> EditorResult<PermissionTree> {
        let mut tree = PermissionTree::new();
        for group in &self.groups {
            tree.add_group(group.clone())?;
        }

        for group in &self.groups {
            for target in &self.targets {
                self.insert_target(&mut tree, group.id, target, None)?;
            }
        }

        tracing::debug!(
            groups = self.groups.len(),
            nodes = tree.len(),
            revision = self.revision,
            "Built permission tree"
        );
        Ok(tree)
    }

    fn insert_target(
        &self,
        tree: &mut PermissionTree,
        group: GroupId,
        target: &TargetSpec,
        parent: Option<&TargetPath>,
    ) -> EditorResult<()> {
        if target.id.is_empty() || target.id.contains('/') {
            return Err(EditorError::InvalidGraph(format!(
                "target id '{}' must be non-empty and must not contain '/'",
                target.id
            )));
        }
        if target.kind == TargetKind::Table && parent.is_none() {
            return Err(EditorError::InvalidGraph(format!(
                "table '{}' has no database",
                target.name
            )));
        }

        let path = match parent {
            Some(parent) => parent.child(&target.id),
            None => TargetPath::new([target.id.as_str()]),
        };
        let values = self.grant(group, &path).copied().unwrap_or_default();
        let parent_scope = parent.map(|p| Scope::new(group, p.clone()));

        tree.insert(
            Scope::new(group, path.clone()),
            target.kind,
            &target.name,
            parent_scope.as_ref(),
            values,
        )?;

        for child in &target.children {
            self.insert_target(tree, group, child, Some(&path))?;
        }
        Ok(())
    }

    /// Copy of the graph keeping only targets whose kind passes `keep`
    ///
    /// A dropped target takes its children with it. Grants are kept as is;
    /// grants for dropped paths are never read.
    pub fn filtered(&self, keep: impl Fn(TargetKind) -> bool) -> PermissionGraph {
        fn retain(targets: &[TargetSpec], keep: &dyn Fn(TargetKind) -> bool) -> Vec<TargetSpec> {
            targets
                .iter()
                .filter(|t| keep(t.kind))
                .map(|t| TargetSpec {
                    children: retain(&t.children, keep),
                    ..t.clone()
                })
                .collect()
        }

        PermissionGraph {
            revision: self.revision,
            groups: self.groups.clone(),
            targets: retain(&self.targets, &keep),
            grants: self.grants.clone(),
        }
    }

    /// Apply an accepted diff and bump the revision
    pub fn apply(&mut self, diff: &DiffSummary) {
        for change in &diff.changes {
            let mut values = self
                .grant(change.scope.group, &change.scope.path)
                .copied()
                .unwrap_or_default();
            values.set(change.new);
            self.set_grant(change.scope.group, &change.scope.path, values);
        }
        self.revision += 1;
    }
}
